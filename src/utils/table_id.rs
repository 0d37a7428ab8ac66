//! Table id dictionary.
//!
//! Table ids are human-friendly words drawn uniformly from this fixed list.
//! The registry retries on collision and falls back to a numeric suffix.

use rand::seq::SliceRandom;
use rand::Rng;

pub const WORDS: &[&str] = &[
    "amber", "anchor", "apricot", "arrow", "aspen", "autumn", "birch", "breeze", "bronze",
    "camellia", "canyon", "cedar", "cinder", "citrine", "clover", "cobalt", "comet", "coral",
    "crimson", "crystal", "cypress", "dawn", "delta", "drift", "dusk", "ember", "falcon", "fern",
    "flint", "frost", "garnet", "ginger", "glacier", "grove", "harbor", "hazel", "heron",
    "hickory", "indigo", "iris", "ivory", "jasper", "juniper", "lagoon", "lantern", "laurel",
    "lilac", "linden", "lotus", "lunar", "magnolia", "maple", "marble", "meadow", "mesa",
    "mirage", "mistral", "monsoon", "mosaic", "myrtle", "nectar", "nimbus", "oasis", "obsidian",
    "olive", "onyx", "opal", "orchid", "osprey", "pebble", "pepper", "pine", "plume", "prairie",
    "quartz", "quince", "raven", "reef", "ridge", "river", "rowan", "saffron", "sage", "sandal",
    "sapphire", "sequoia", "sierra", "slate", "sorrel", "sparrow", "spruce", "summit", "sunset",
    "tamarind", "thistle", "timber", "topaz", "tulip", "tundra", "velvet", "violet", "walnut",
    "willow", "wren", "zephyr",
];

/// Uniformly random word from the dictionary.
pub fn random_word<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    WORDS.choose(rng).copied().unwrap_or("table")
}
