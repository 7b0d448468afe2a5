use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tap_core::dict::{Dictionary, FormatVersion};
use tap_core::suggest::{get_suggestions, InputPoint, ProximityInfo, TraverseSession};
use tap_core::unicode::code_points_from_str;

fn build_dict() -> Dictionary {
    let mut dict = Dictionary::new_dynamic(FormatVersion::DynamicV3, "en").unwrap();
    let alphabet = ["st", "ca", "tr", "pl", "br"];
    let suffixes = ["at", "ar", "ark", "ane", "ing", "ay", "own", "ide", "ap", "im"];
    let mut probability = 40;
    for prefix in alphabet {
        for suffix in suffixes {
            let word = format!("{prefix}{suffix}");
            dict.add_unigram(&code_points_from_str(&word), probability, 0)
                .unwrap();
            probability = (probability % 250) + 1;
        }
    }
    dict.add_bigram(&code_points_from_str("caat"), &code_points_from_str("trat"), 8)
        .unwrap();
    dict
}

fn bench_typing(c: &mut Criterion) {
    let dict = build_dict();
    let proximity = ProximityInfo::qwerty();
    let input: Vec<InputPoint> = "catr"
        .chars()
        .map(|ch| InputPoint::from_code_point(ch as i32))
        .collect();

    c.bench_function("suggest_typed_4", |b| {
        let mut session = TraverseSession::new();
        b.iter(|| {
            let results =
                get_suggestions(&dict, &proximity, &mut session, black_box(&input), None, 0);
            black_box(results.len())
        })
    });
}

criterion_group!(benches, bench_typing);
criterion_main!(benches);
