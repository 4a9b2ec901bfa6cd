use std::time::{Duration, SystemTime};

use rand::rngs::StdRng;
use rand::SeedableRng;

use keyrace::race::{MemorySink, RaceSink};
use keyrace::session::{SessionState, TypingSession};
use keyrace::training::{practice_chars, ClusterGenerator};

fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs)
}

// Types `target` char by char as a word field would see it, substituting
// `wrong` once at each index in `slips` before correcting it.
fn type_with_slips(
    session: &mut TypingSession,
    target: &str,
    slips: &[(usize, char)],
) -> Option<keyrace::RaceRecord> {
    let mut field = String::new();
    let mut record = None;
    let mut t = 0;
    for (idx, c) in target.chars().enumerate() {
        if let Some((_, wrong)) = slips.iter().find(|(i, _)| *i == idx) {
            field.push(*wrong);
            session.on_input_at(&field, at(t));
            field.pop();
            session.on_input_at(&field, at(t));
        }
        field.push(c);
        t += 1;
        record = session.on_input_at(&field, at(t));
        if c == ' ' && session.pending_input().is_empty() {
            field.clear();
        }
    }
    record
}

#[test]
fn mistakes_become_a_training_quote() {
    let mut session = TypingSession::with_target("quiz the lazy fox");
    // slip on 'z' twice and on 'q' once
    let record = type_with_slips(
        &mut session,
        "quiz the lazy fox",
        &[(0, 'w'), (3, 'x'), (11, 'x')],
    )
    .unwrap();

    assert_eq!(record.mistaked_key_labels, ["Z", "Q"]);
    assert_eq!(practice_chars(&record.mistaked_key_labels), vec!['z', 'q']);

    let mut sink = MemorySink::default();
    sink.submit_race("ada", &record).unwrap();

    let quote = ClusterGenerator::default()
        .generate_with(&record.mistaked_key_labels, &mut StdRng::seed_from_u64(3))
        .unwrap();
    assert!(quote
        .split(' ')
        .all(|cluster| cluster.chars().any(|c| c == 'z' || c == 'q')));

    // the training quote replaces the finished target and can be raced again
    session.load_target(quote.clone());
    assert_eq!(session.state(), SessionState::Loaded);
    let training = type_with_slips(&mut session, &quote, &[]).unwrap();
    assert_eq!(training.quote_text, quote);
    assert!(training.mistaked_key_labels.is_empty());
}

#[test]
fn histogram_survives_corrections_across_words() {
    let mut session = TypingSession::with_target("ab ab");
    type_with_slips(&mut session, "ab ab", &[(1, 'x'), (4, 'y')]).unwrap();
    assert_eq!(session.mistake_histogram().get(&'B'), Some(&2));
    assert_eq!(session.mistaked_key_labels(), ["B"]);
}
