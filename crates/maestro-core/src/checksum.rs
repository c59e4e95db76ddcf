//! Structural checksums and the human-friendly codenames derived from them.
//!
//! A [`Checksum`] is a SHA-1 digest computed structurally: compound values
//! hash their fields in declaration order, strings hash their UTF-8 bytes,
//! containers hash their elements in order. Two plans with equal content
//! therefore share a digest regardless of how they were built, and the
//! digest in turn picks a deterministic `adverb adjective noun` codename
//! from the embedded word lists.

use std::collections::BTreeMap;
use std::fmt;

use sha1::{Digest, Sha1};

/// A 160-bit structural digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checksum {
    digest: [u8; 20],
}

impl Checksum {
    pub fn of<T: Checksumable + ?Sized>(value: &T) -> Checksum {
        let mut hasher = Sha1::new();
        value.checksum(&mut hasher);
        Checksum {
            digest: hasher.finalize().into(),
        }
    }

    pub fn hex(&self) -> String {
        self.digest.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Deterministic three-word codename, title-cased, every word at most
    /// six letters.
    pub fn petname(&self) -> String {
        let adverb = ADVERBS[chunk(&self.digest, 0) as usize % ADVERBS.len()];
        let adjective = ADJECTIVES[chunk(&self.digest, 6) as usize % ADJECTIVES.len()];
        let noun = NOUNS[chunk(&self.digest, 12) as usize % NOUNS.len()];
        format!("{} {} {}", title(adverb), title(adjective), title(noun))
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

fn chunk(digest: &[u8; 20], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[offset..offset + 8]);
    u64::from_be_bytes(bytes)
}

fn title(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Values that can feed a structural checksum.
pub trait Checksumable {
    fn checksum(&self, hasher: &mut Sha1);
}

impl Checksumable for str {
    fn checksum(&self, hasher: &mut Sha1) {
        hasher.update(self.as_bytes());
    }
}

impl Checksumable for String {
    fn checksum(&self, hasher: &mut Sha1) {
        self.as_str().checksum(hasher);
    }
}

impl Checksumable for u64 {
    fn checksum(&self, hasher: &mut Sha1) {
        hasher.update(self.to_be_bytes());
    }
}

impl Checksumable for usize {
    fn checksum(&self, hasher: &mut Sha1) {
        (*self as u64).checksum(hasher);
    }
}

impl Checksumable for bool {
    fn checksum(&self, hasher: &mut Sha1) {
        hasher.update([*self as u8]);
    }
}

impl Checksumable for semver::Version {
    fn checksum(&self, hasher: &mut Sha1) {
        self.to_string().checksum(hasher);
    }
}

impl<T: Checksumable> Checksumable for [T] {
    fn checksum(&self, hasher: &mut Sha1) {
        for item in self {
            item.checksum(hasher);
        }
    }
}

impl<T: Checksumable> Checksumable for Vec<T> {
    fn checksum(&self, hasher: &mut Sha1) {
        self.as_slice().checksum(hasher);
    }
}

impl<T: Checksumable> Checksumable for Option<T> {
    fn checksum(&self, hasher: &mut Sha1) {
        match self {
            Some(value) => {
                true.checksum(hasher);
                value.checksum(hasher);
            }
            None => false.checksum(hasher),
        }
    }
}

impl<K: Checksumable, V: Checksumable> Checksumable for BTreeMap<K, V> {
    fn checksum(&self, hasher: &mut Sha1) {
        for (key, value) in self {
            key.checksum(hasher);
            value.checksum(hasher);
        }
    }
}

const ADVERBS: &[&str] = &[
    "boldly", "calmly", "deftly", "duly", "early", "easily", "fondly", "freely", "gently",
    "gladly", "justly", "keenly", "kindly", "lately", "loudly", "madly", "mainly", "neatly",
    "nicely", "oddly", "openly", "partly", "poorly", "purely", "rarely", "richly", "sadly",
    "safely", "simply", "slowly", "softly", "solely", "subtly", "surely", "tamely", "tidily",
    "truly", "vastly", "warmly", "wildly", "wisely",
];

const ADJECTIVES: &[&str] = &[
    "able", "active", "adept", "agile", "alert", "amber", "ample", "awake", "brave", "brisk",
    "calm", "cheery", "chief", "civil", "clean", "clear", "clever", "cozy", "crisp", "daring",
    "eager", "exact", "fair", "fancy", "fine", "firm", "fleet", "fond", "frank", "fresh",
    "gentle", "glad", "golden", "grand", "happy", "hardy", "honest", "humble", "ideal", "jolly",
    "keen", "kind", "light", "lively", "loyal", "lucid", "lucky", "merry", "mighty", "modest",
    "neat", "noble", "novel", "polite", "proud", "quick", "quiet", "rapid", "ready", "robust",
    "royal", "sage", "sharp", "shiny", "sleek", "smart", "solid", "sound", "stable", "steady",
    "stout", "sunny", "superb", "swift", "tender", "tidy", "trusty", "upbeat", "valid", "vivid",
    "warm", "wise", "witty", "worthy",
];

const NOUNS: &[&str] = &[
    "badger", "beagle", "beaver", "bobcat", "bonobo", "cicada", "condor", "cougar", "coyote",
    "crane", "dingo", "donkey", "eagle", "falcon", "ferret", "finch", "gecko", "gibbon", "goose",
    "grouse", "heron", "hornet", "iguana", "impala", "jackal", "jaguar", "kitten", "koala",
    "lemur", "lizard", "llama", "magpie", "marmot", "marten", "merlin", "mole", "moose", "mouse",
    "ocelot", "orca", "osprey", "otter", "owl", "panda", "parrot", "pigeon", "plover", "pony",
    "possum", "puffin", "python", "rabbit", "raven", "robin", "salmon", "seal", "shrew", "shrike",
    "skink", "sloth", "tapir", "thrush", "tiger", "toad", "toucan", "trout", "turtle", "viper",
    "walrus", "weasel", "whale", "wombat", "wren", "zebra",
];
