use std::path::{Path, PathBuf};
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use tap_core::dict::{Dictionary, FormatVersion, WordAttributes, NOT_A_DICT_POS};
use tap_core::suggest::{self, InputPoint, ProximityInfo};
use tap_core::unicode::{code_points_from_str, string_from_code_points};
use tap_engine::{Engine, SuggestSession};

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

fn now_epoch() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as u32
}

fn open_updatable(path: &Path) -> Dictionary {
    die!(
        Dictionary::open_updatable(path),
        "Error opening dictionary: {}"
    )
}

fn open_read_only(path: &Path) -> Dictionary {
    die!(Dictionary::open(path), "Error opening dictionary: {}")
}

pub fn create(path: &Path, locale: &str, decaying: bool) {
    let version = if decaying {
        FormatVersion::DynamicV4
    } else {
        FormatVersion::DynamicV3
    };
    let mut dict = die!(
        Dictionary::new_dynamic(version, locale),
        "Error creating dictionary: {}"
    );
    die!(dict.flush(path), "Error writing dictionary: {}");
    println!("Created {} ({:?}, locale {locale})", path.display(), version);
}

pub fn info(path: &Path) {
    let dict = open_read_only(path);
    println!("version:  {:?}", dict.version());
    println!("unigrams: {}", dict.unigram_count());
    println!("bigrams:  {}", dict.bigram_count());
    println!("needs gc: {}", dict.needs_gc());
    for (key, value) in dict.header().attributes() {
        println!("  {key} = {value}");
    }
}

pub fn lookup(path: &Path, word: &str) {
    let dict = open_read_only(path);
    let cps = code_points_from_str(word);
    let pos = dict.find_terminal(&cps, false);
    if pos == NOT_A_DICT_POS {
        println!("not found: {word}");
        return;
    }
    println!("{word}: probability {}", dict.probability_of(&cps));
    let shortcuts = dict.shortcuts_of(pos);
    for target in shortcuts {
        println!(
            "  shortcut → {} ({})",
            string_from_code_points(&target.code_points),
            target.probability
        );
    }
    for (target, probability) in dict.bigrams_for_terminal(pos) {
        if let Some((next, _)) = dict.word_at(target) {
            println!(
                "  bigram → {} ({probability})",
                string_from_code_points(&next)
            );
        }
    }
}

pub fn add_word(path: &Path, word: &str, probability: i32, not_a_word: bool, blacklisted: bool) {
    let mut dict = open_updatable(path);
    let attributes = WordAttributes {
        is_not_a_word: not_a_word,
        is_blacklisted: blacklisted,
    };
    die!(
        dict.add_unigram_with_attributes(
            &code_points_from_str(word),
            probability,
            attributes,
            now_epoch()
        ),
        "Error adding word: {}"
    );
    die!(dict.flush(path), "Error writing dictionary: {}");
    println!("Added: {word} ({probability})");
}

pub fn add_bigram(path: &Path, prev: &str, next: &str, probability: i32) {
    let mut dict = open_updatable(path);
    die!(
        dict.add_bigram(
            &code_points_from_str(prev),
            &code_points_from_str(next),
            probability
        ),
        "Error adding bigram: {}"
    );
    die!(dict.flush(path), "Error writing dictionary: {}");
    println!("Added bigram: {prev} → {next} ({probability})");
}

pub fn remove_bigram(path: &Path, prev: &str, next: &str) {
    let mut dict = open_updatable(path);
    die!(
        dict.remove_bigram(&code_points_from_str(prev), &code_points_from_str(next)),
        "Error removing bigram: {}"
    );
    die!(dict.flush(path), "Error writing dictionary: {}");
    println!("Removed bigram: {prev} → {next}");
}

pub fn suggest(path: &Path, extra_dicts: &[PathBuf], input: &str, prev_word: Option<&str>, n: usize) {
    let mut engine = Engine::new();
    die!(engine.open_dictionary(path), "Error opening dictionary: {}");
    for extra in extra_dicts {
        die!(engine.open_dictionary(extra), "Error opening dictionary: {}");
    }

    let proximity = ProximityInfo::qwerty();
    let mut session = SuggestSession::new();
    let points: Vec<InputPoint> = input
        .chars()
        .map(|c| InputPoint::from_code_point(c as i32))
        .collect();
    let prev = prev_word.map(code_points_from_str);
    let results = engine.suggestions(&proximity, &mut session, &points, prev.as_deref());
    for (rank, s) in results.iter().take(n).enumerate() {
        println!(
            "{:2}. {} ({}, {:?})",
            rank + 1,
            string_from_code_points(&s.code_points),
            s.score,
            s.kind
        );
    }
}

pub fn predict(path: &Path, prev_word: &str, first_letter: Option<char>, n: usize) {
    let dict = open_read_only(path);
    let results = suggest::predict(
        &dict,
        &code_points_from_str(prev_word),
        first_letter.map(|c| c as i32),
        now_epoch(),
    );
    for (rank, s) in results.iter().take(n).enumerate() {
        println!(
            "{:2}. {} ({})",
            rank + 1,
            string_from_code_points(&s.code_points),
            s.score
        );
    }
}

pub fn gc(path: &Path, output: &Path) {
    let mut dict = open_updatable(path);
    let before = dict.unigram_count();
    die!(
        dict.flush_with_gc(output, now_epoch()),
        "Error collecting dictionary: {}"
    );
    println!(
        "Collected {} → {} ({} → {} unigrams)",
        path.display(),
        output.display(),
        before,
        dict.unigram_count()
    );
}

/// Import a word list: one `word<TAB>probability` per line, `#` comments.
pub fn import(path: &Path, list: &Path) {
    let mut dict = open_updatable(path);
    let content = die!(std::fs::read_to_string(list), "Error reading word list: {}");
    let now = now_epoch();
    let mut added = 0u32;
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split('\t');
        let (Some(word), Some(probability)) = (fields.next(), fields.next()) else {
            eprintln!("line {}: expected word<TAB>probability", line_no + 1);
            process::exit(1);
        };
        let probability: i32 = die!(
            probability.parse().map_err(|_| format!("line {}: bad probability", line_no + 1)),
            "{}"
        );
        die!(
            dict.add_unigram(&code_points_from_str(word), probability, now),
            "Error adding word: {}"
        );
        added += 1;
    }
    die!(dict.flush(path), "Error writing dictionary: {}");
    println!("Imported {added} words into {}", path.display());
}

/// Export every word as `word<TAB>probability` lines, walking the trie.
pub fn export(path: &Path) {
    let dict = open_read_only(path);
    let mut words = dict.all_words();
    words.sort();
    for (word, probability) in words {
        println!("{}\t{}", string_from_code_points(&word), probability);
    }
}
