//! Shared fixtures.

use std::path::Path;

use concept_shift::{MemorySpace, SpaceRegistry};

pub const COMPUTING: &[(&str, [f32; 3])] = &[
    ("computer", [1.0, 0.0, 0.0]),
    ("machine", [0.9, 0.3, 0.0]),
    ("calculator", [0.8, 0.5, 0.0]),
    ("engine", [0.5, 0.9, 0.0]),
    ("banana", [0.0, 0.0, 1.0]),
];

pub fn space(entries: &[(&str, [f32; 3])]) -> MemorySpace {
    MemorySpace::from_entries(
        3,
        entries
            .iter()
            .map(|(t, v)| (t.to_string(), v.to_vec()))
            .collect(),
    )
    .unwrap()
}

/// Three slices 1950..1952. With `gap`, 1951 lacks "computer" and "calculator".
pub fn registry(gap: bool) -> SpaceRegistry {
    let middle: Vec<(&str, [f32; 3])> = if gap {
        COMPUTING
            .iter()
            .copied()
            .filter(|(t, _)| *t != "computer" && *t != "calculator")
            .collect()
    } else {
        COMPUTING.to_vec()
    };

    SpaceRegistry::new()
        .with_space("1950", space(COMPUTING))
        .unwrap()
        .with_space("1951", space(&middle))
        .unwrap()
        .with_space("1952", space(COMPUTING))
        .unwrap()
}

/// Five identical slices 1950..1954.
pub fn five_slices() -> SpaceRegistry {
    (1950..1955).fold(SpaceRegistry::new(), |reg, year| {
        reg.with_space(year.to_string(), space(COMPUTING)).unwrap()
    })
}

/// Write `COMPUTING` as a text word2vec file named `<key>.w2v`.
pub fn write_text_model(dir: &Path, key: &str) {
    let mut content = format!("{} 3\n", COMPUTING.len());
    for (term, v) in COMPUTING {
        content.push_str(&format!("{} {} {} {}\n", term, v[0], v[1], v[2]));
    }
    std::fs::write(dir.join(format!("{}.w2v", key)), content).unwrap();
}
