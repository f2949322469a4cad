use std::fmt;
use std::io;

use itertools::Itertools;
use serde::Serialize;

use crate::graph::ConflictGraph;
use crate::model::condition::Score;
use crate::model::entity::Ship;
use crate::solver::Candidate;

#[derive(Debug, Clone, PartialEq)]
pub struct FleetEntry {
    pub ship: Ship,
    pub weight: Score,
}

/// The winning set of ships, heaviest first, with its total score.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fleet {
    entries: Vec<FleetEntry>,
    total: Score,
}

#[derive(Serialize)]
struct FleetRow<'a> {
    #[serde(rename = "Character A")]
    first: &'a str,
    #[serde(rename = "Character B")]
    second: &'a str,
    #[serde(rename = "Score")]
    score: Score,
}

/// Whole scores print as integers padded to four columns, fractional ones with four decimals.
pub fn format_score(score: Score) -> String {
    if score.fract() == 0.0 && score.abs() < 1e15 {
        format!("{:<4}", score as i64)
    } else {
        format!("{:<9.4}", score)
    }
}

impl Fleet {
    pub fn from_candidate(graph: &ConflictGraph, candidate: &Candidate) -> Fleet {
        let entries: Vec<FleetEntry> = candidate
            .nodes()
            .iter()
            .filter_map(|&index| graph.node(index))
            .map(|node| FleetEntry { ship: node.ship.clone(), weight: node.weight })
            .sorted_by(|a, b| b.weight.total_cmp(&a.weight).then_with(|| a.ship.cmp(&b.ship)))
            .collect();
        Fleet { entries, total: candidate.score() }
    }

    pub fn entries(&self) -> &[FleetEntry] {
        &self.entries
    }

    pub fn total(&self) -> Score {
        self.total
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(writer);
        if self.entries.is_empty() {
            writer.write_record(["Character A", "Character B", "Score"])?;
        }
        for entry in &self.entries {
            writer.serialize(FleetRow {
                first: entry.ship.first(),
                second: entry.ship.second(),
                score: entry.weight,
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl fmt::Display for Fleet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Highest scoring fleet:")?;
        for entry in &self.entries {
            writeln!(f, "{} - {} / {}", format_score(entry.weight), entry.ship.first(), entry.ship.second())?;
        }
        writeln!(f)?;
        write!(f, "Total fleet score: {}", format_score(self.total).trim_end())
    }
}
