//! Match records and their aggregation.
//!
//! The COLLECT phase produces one [`MatchRecord`] per successful match. A
//! [`MatchChart`] groups records by (matched values, pattern text) in discovery
//! order, and a [`Ranking`] splits the groups into fire and wildcard candidates.

use crate::pattern::Pattern;
use crate::rule::GrammarCoordinate;
use ordered_float::OrderedFloat;
use priority_queue::PriorityQueue;
use rustc_hash::FxHashMap;
use std::cmp::Reverse;
use std::fmt;
use std::rc::Rc;

/// One successful match of one pattern against one rule span.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchRecord {
    pub values: Vec<String>,
    /// Source text of the matching pattern.
    pub pattern: Rc<str>,
    /// Position of the pattern in the program.
    pub pattern_index: usize,
    pub coordinate: GrammarCoordinate,
    pub wildcards: Vec<usize>,
}

impl MatchRecord {
    /// Aggregation key as text: `values | pattern`.
    pub fn key(&self) -> String {
        format!("{} | {}", self.values.join(" "), self.pattern)
    }
}

impl fmt::Display for MatchRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.key(), self.coordinate)
    }
}

/// Aggregated occurrences of one (values, pattern) key.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub values: Vec<String>,
    pub pattern: Rc<str>,
    pub count: usize,
    pub coordinates: Vec<GrammarCoordinate>,
    fire_threshold: OrderedFloat<f64>,
    wildcard_threshold: OrderedFloat<f64>,
    discovery: usize,
}

impl Candidate {
    /// Length of the matched value sequence.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the matched value sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Position at which this key was first seen.
    pub fn discovery(&self) -> usize {
        self.discovery
    }

    /// Check if the count meets the fire threshold.
    pub fn fires(&self) -> bool {
        OrderedFloat(self.count as f64) >= self.fire_threshold
    }

    /// Check if the count meets the wildcard threshold.
    pub fn generalizes(&self) -> bool {
        OrderedFloat(self.count as f64) >= self.wildcard_threshold
    }

    /// Higher count first, then earlier discovery.
    fn priority(&self) -> (usize, Reverse<usize>) {
        (self.count, Reverse(self.discovery))
    }
}

type ChartKey = (Vec<String>, Rc<str>);

/// Records grouped by (values, pattern text).
#[derive(Debug, Default)]
pub struct MatchChart {
    candidates: Vec<Candidate>,
    index: FxHashMap<ChartKey, usize>,
}

impl MatchChart {
    /// Create an empty chart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate `records`; `patterns` supplies each record's thresholds.
    pub fn from_records(records: &[MatchRecord], patterns: &[Pattern]) -> Self {
        let mut chart = MatchChart::new();
        for record in records {
            if let Some(pattern) = patterns.get(record.pattern_index) {
                chart.add(record, pattern);
            }
        }
        chart
    }

    /// Count one record.
    pub fn add(&mut self, record: &MatchRecord, pattern: &Pattern) {
        let key = (record.values.clone(), record.pattern.clone());
        let next = self.candidates.len();
        let slot = *self.index.entry(key).or_insert(next);
        if slot == next {
            self.candidates.push(Candidate {
                values: record.values.clone(),
                pattern: record.pattern.clone(),
                count: 0,
                coordinates: Vec::new(),
                fire_threshold: OrderedFloat(pattern.fire_threshold()),
                wildcard_threshold: OrderedFloat(pattern.wildcard_threshold()),
                discovery: next,
            });
        }
        let candidate = &mut self.candidates[slot];
        candidate.count += 1;
        candidate.coordinates.push(record.coordinate);
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Check if no record has been counted.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Count for a key, zero if never seen.
    pub fn count(&self, values: &[&str], pattern: &str) -> usize {
        self.candidates
            .iter()
            .find(|c| {
                c.pattern.as_ref() == pattern
                    && c.values.len() == values.len()
                    && c.values.iter().zip(values).all(|(a, b)| a == b)
            })
            .map_or(0, |c| c.count)
    }

    /// Candidates in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    /// Split into fire and wildcard candidates, each by descending count.
    pub fn rank(&self) -> Ranking<'_> {
        let mut fire = PriorityQueue::new();
        let mut wildcard = PriorityQueue::new();
        for (i, candidate) in self.candidates.iter().enumerate() {
            if candidate.fires() {
                fire.push(i, candidate.priority());
            }
            if candidate.generalizes() {
                wildcard.push(i, candidate.priority());
            }
        }
        Ranking {
            fire: drain(fire, &self.candidates),
            wildcard: drain(wildcard, &self.candidates),
        }
    }
}

fn drain<'a>(
    mut queue: PriorityQueue<usize, (usize, Reverse<usize>)>,
    candidates: &'a [Candidate],
) -> Vec<&'a Candidate> {
    let mut out = Vec::with_capacity(queue.len());
    while let Some((i, _)) = queue.pop() {
        out.push(&candidates[i]);
    }
    out
}

/// Candidates that met a threshold, highest priority first.
#[derive(Debug, Default)]
pub struct Ranking<'a> {
    pub fire: Vec<&'a Candidate>,
    pub wildcard: Vec<&'a Candidate>,
}
