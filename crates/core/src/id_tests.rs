// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

crate::define_id! {
    /// Scratch id type for exercising the macro in isolation.
    pub struct ScratchId("scr-");
}

#[test]
fn generated_id_has_prefix_and_fixed_length() {
    let id = ScratchId::new();
    assert!(id.as_str().starts_with("scr-"));
    assert_eq!(id.as_str().len(), ID_MAX_LEN);
}

#[test]
fn from_string_round_trips_display() {
    let id = ScratchId::from_string("scr-abc");
    assert_eq!(id.to_string(), "scr-abc");
    assert_eq!(id.suffix(), "abc");
}

#[test]
fn short_truncates_suffix() {
    let id = ScratchId::from_string("scr-abcdefgh");
    assert_eq!(id.short(3), "abc");
}

#[test]
fn id_buf_borrows_as_str_for_hashmap_lookup() {
    use std::collections::HashMap;
    let id = ScratchId::new();
    let key: String = id.as_str().to_string();
    let mut map: HashMap<ScratchId, u32> = HashMap::new();
    map.insert(id, 1);
    assert_eq!(map.get(key.as_str()), Some(&1));
}
