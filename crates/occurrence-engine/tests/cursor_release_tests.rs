//! Cursor lifecycle tests against a scripted evaluator.
//!
//! The scripted evaluator counts how many handles it opened and how many were
//! dropped, so every exit path can be checked for release-exactly-once.

use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use occurrence_engine::{
    CalendarInstant, CursorHandle, OccurrenceError, QueryEngine, QuerySpec, QueryState,
    RecurrenceEvaluator, RecurrenceRule, Schedule, Termination, MAX_RANGE_RESULTS,
};

// ---------------------------------------------------------------------------
// Scripted evaluator
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum Script {
    /// Unbounded: anchor, anchor + step, anchor + 2*step, ...
    Every(Duration),
    /// Exactly these instants, regardless of anchor.
    Fixed(Vec<CalendarInstant>),
}

#[derive(Default, Clone)]
struct Counters {
    opened: Rc<Cell<usize>>,
    released: Rc<Cell<usize>>,
}

impl Counters {
    fn opened(&self) -> usize {
        self.opened.get()
    }

    fn released(&self) -> usize {
        self.released.get()
    }
}

struct ScriptedEvaluator {
    script: Script,
    counters: Counters,
}

impl ScriptedEvaluator {
    fn new(script: Script) -> (Self, Counters) {
        let counters = Counters::default();
        (
            Self {
                script,
                counters: counters.clone(),
            },
            counters,
        )
    }
}

struct ScriptedSchedule {
    script: Script,
    anchor: CalendarInstant,
    counters: Counters,
}

struct ScriptedHandle {
    script: Script,
    next: NaiveDateTime,
    index: usize,
    counters: Counters,
}

impl RecurrenceEvaluator for ScriptedEvaluator {
    type Schedule = ScriptedSchedule;

    fn check_rule(&self, text: &str) -> Result<(), String> {
        if text.starts_with("FREQ=") {
            Ok(())
        } else {
            Err("no frequency".to_string())
        }
    }

    fn schedule(&self, _rule: &RecurrenceRule, anchor: CalendarInstant) -> ScriptedSchedule {
        ScriptedSchedule {
            script: self.script.clone(),
            anchor,
            counters: self.counters.clone(),
        }
    }
}

impl Schedule for ScriptedSchedule {
    fn open_cursor(&self) -> Box<dyn CursorHandle + '_> {
        self.counters.opened.set(self.counters.opened() + 1);
        Box::new(ScriptedHandle {
            script: self.script.clone(),
            next: self.anchor.as_naive(),
            index: 0,
            counters: self.counters.clone(),
        })
    }
}

impl CursorHandle for ScriptedHandle {
    fn advance(&mut self) -> Option<CalendarInstant> {
        match &self.script {
            Script::Every(step) => {
                let current = CalendarInstant::from_naive(self.next).ok()?;
                self.next += *step;
                Some(current)
            }
            Script::Fixed(instants) => {
                let current = instants.get(self.index).copied();
                self.index += 1;
                current
            }
        }
    }
}

impl Drop for ScriptedHandle {
    fn drop(&mut self) {
        self.counters.released.set(self.counters.released() + 1);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn utc(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
}

fn instant(y: i32, mo: u32, d: u32, h: u32) -> CalendarInstant {
    CalendarInstant::new(y, mo, d, h, 0, 0).unwrap()
}

fn engine(script: Script) -> (QueryEngine<ScriptedEvaluator>, Counters) {
    let (evaluator, counters) = ScriptedEvaluator::new(script);
    (QueryEngine::with_evaluator(evaluator), counters)
}

fn rule(engine: &QueryEngine<ScriptedEvaluator>) -> RecurrenceRule {
    engine.validate_rule("FREQ=SECONDLY").unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn unbounded_range_is_capped_and_released_once() {
    let (engine, counters) = engine(Script::Every(Duration::seconds(1)));
    let rule = rule(&engine);
    let spec = QuerySpec::Range {
        start: utc(2025, 1, 1, 0),
        end: utc(2030, 1, 1, 0),
    };
    let query = engine.prepare(&rule, &spec, &utc(2025, 1, 1, 0)).unwrap();

    let mut occurrences = query.iter();
    let collected: Vec<_> = occurrences.by_ref().collect();

    assert_eq!(collected.len(), MAX_RANGE_RESULTS);
    assert_eq!(occurrences.state(), QueryState::Closed(Termination::Capped));
    assert_eq!(counters.opened(), 1);
    assert_eq!(counters.released(), 1, "released as soon as the cap is hit");

    drop(occurrences);
    assert_eq!(counters.released(), 1);
}

#[test]
fn abandoning_a_stream_releases_the_cursor() {
    let (engine, counters) = engine(Script::Every(Duration::hours(1)));
    let rule = rule(&engine);
    let spec = QuerySpec::BoundedCount {
        after: utc(2025, 1, 1, 0),
        limit: 500,
    };
    let query = engine.prepare(&rule, &spec, &utc(2025, 1, 1, 0)).unwrap();

    {
        let mut occurrences = query.iter();
        assert_eq!(occurrences.next(), Some(utc(2025, 1, 1, 1)));
        assert_eq!(occurrences.next(), Some(utc(2025, 1, 1, 2)));
        assert_eq!(counters.released(), 0);
    }

    assert_eq!(counters.opened(), 1);
    assert_eq!(counters.released(), 1);
}

#[test]
fn explicit_close_is_terminal() {
    let (engine, counters) = engine(Script::Every(Duration::hours(1)));
    let rule = rule(&engine);
    let spec = QuerySpec::BoundedCount {
        after: utc(2025, 1, 1, 0),
        limit: 10,
    };
    let query = engine.prepare(&rule, &spec, &utc(2025, 1, 1, 0)).unwrap();

    let mut occurrences = query.iter();
    occurrences.next();
    occurrences.close();
    assert_eq!(
        occurrences.state(),
        QueryState::Closed(Termination::Cancelled)
    );
    assert_eq!(occurrences.next(), None);
    occurrences.close();
    drop(occurrences);

    assert_eq!(counters.released(), 1);
}

#[test]
fn unpulled_query_never_opens_a_cursor() {
    let (engine, counters) = engine(Script::Every(Duration::hours(1)));
    let rule = rule(&engine);
    let spec = QuerySpec::NextSingle {
        after: utc(2025, 1, 1, 0),
    };
    let query = engine.prepare(&rule, &spec, &utc(2025, 1, 1, 0)).unwrap();
    drop(query.iter());

    assert_eq!(counters.opened(), 0);
    assert_eq!(counters.released(), 0);
}

#[test]
fn exhausted_bounded_count_returns_what_exists() {
    let (engine, counters) = engine(Script::Fixed(vec![
        instant(2025, 1, 1, 0),
        instant(2025, 1, 2, 0),
        instant(2025, 1, 3, 0),
    ]));
    let rule = rule(&engine);
    let result = engine
        .next_occurrences(&rule, &utc(2025, 1, 1, 0), 10, &utc(2025, 1, 1, 0))
        .unwrap();

    assert_eq!(result, vec![utc(2025, 1, 2, 0), utc(2025, 1, 3, 0)]);
    assert_eq!((counters.opened(), counters.released()), (1, 1));
}

#[test]
fn duplicate_occurrences_pass_through() {
    let (engine, _counters) = engine(Script::Fixed(vec![
        instant(2025, 1, 1, 0),
        instant(2025, 1, 2, 0),
        instant(2025, 1, 2, 0),
        instant(2025, 1, 3, 0),
    ]));
    let rule = rule(&engine);
    let result = engine
        .occurrences_in_range(
            &rule,
            &utc(2025, 1, 2, 0),
            &utc(2025, 1, 3, 0),
            &utc(2025, 1, 1, 0),
        )
        .unwrap();

    assert_eq!(
        result,
        vec![utc(2025, 1, 2, 0), utc(2025, 1, 2, 0), utc(2025, 1, 3, 0)]
    );
}

#[test]
fn range_stops_pulling_past_end() {
    let (engine, counters) = engine(Script::Every(Duration::days(1)));
    let rule = rule(&engine);
    let spec = QuerySpec::Range {
        start: utc(2025, 1, 3, 0),
        end: utc(2025, 1, 5, 0),
    };
    let query = engine.prepare(&rule, &spec, &utc(2025, 1, 1, 0)).unwrap();
    let mut occurrences = query.iter();

    assert_eq!(occurrences.by_ref().count(), 3);
    assert_eq!(
        occurrences.state(),
        QueryState::Closed(Termination::Exhausted)
    );
    assert_eq!(counters.released(), 1);
}

#[test]
fn next_single_releases_after_first_match() {
    let (engine, counters) = engine(Script::Every(Duration::minutes(15)));
    let rule = rule(&engine);
    let next = engine
        .next_occurrence(&rule, &utc(2025, 1, 1, 1), &utc(2025, 1, 1, 0))
        .unwrap();

    assert_eq!(next, Some(utc(2025, 1, 1, 1) + Duration::minutes(15)));
    assert_eq!((counters.opened(), counters.released()), (1, 1));
}

#[test]
fn next_single_without_match_is_none() {
    let (engine, counters) = engine(Script::Fixed(vec![instant(2025, 1, 1, 0)]));
    let rule = rule(&engine);
    let next = engine
        .next_occurrence(&rule, &utc(2025, 6, 1, 0), &utc(2025, 1, 1, 0))
        .unwrap();

    assert_eq!(next, None);
    assert_eq!((counters.opened(), counters.released()), (1, 1));
}

#[test]
fn parameter_errors_happen_before_any_cursor() {
    let (engine, counters) = engine(Script::Every(Duration::hours(1)));
    let rule = rule(&engine);

    let err = engine
        .next_occurrences(&rule, &utc(2025, 1, 1, 0), 0, &utc(2025, 1, 1, 0))
        .unwrap_err();
    assert!(matches!(err, OccurrenceError::InvalidParameter(_)));

    let err = engine
        .next_occurrence(&rule, &utc(2025, 1, 1, 0), &utc(10_500, 1, 1, 0))
        .unwrap_err();
    assert!(matches!(err, OccurrenceError::TimestampOutOfRange(_)));

    assert_eq!(counters.opened(), 0);
}

#[test]
fn validation_goes_through_the_evaluator() {
    let (engine, _counters) = engine(Script::Every(Duration::hours(1)));
    assert!(engine.is_valid_rule("FREQ=ANYTHING"));
    assert!(!engine.is_valid_rule("nope"));
    assert_eq!(
        engine.validate_rule("nope").unwrap_err(),
        OccurrenceError::InvalidRule("nope".to_string())
    );
}
