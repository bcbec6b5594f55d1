//! Splice junction sets and their tab-separated on-disk representation.

use anyhow::{ensure, Context, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A splice junction: a donor/acceptor coordinate pair on one reference
/// sequence. Ordered by (sequence, donor, acceptor) so sets iterate
/// deterministically.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Junction {
    pub sequence: String,
    pub donor: u64,
    pub acceptor: u64,
}

impl Junction {
    pub fn new(sequence: impl Into<String>, donor: u64, acceptor: u64) -> Junction {
        Junction {
            sequence: sequence.into(),
            donor,
            acceptor,
        }
    }

    /// Genomic distance between the two splice sites.
    pub fn span(&self) -> u64 {
        self.donor.abs_diff(self.acceptor)
    }
}

/// A deduplicated set of splice junctions. Annotation-derived and
/// read-derived junctions merge into one of these before persistence.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct JunctionSet {
    junctions: BTreeSet<Junction>,
}

impl JunctionSet {
    pub fn new() -> JunctionSet {
        JunctionSet::default()
    }

    /// Returns false if the junction was already present.
    pub fn insert(&mut self, junction: Junction) -> bool {
        self.junctions.insert(junction)
    }

    pub fn len(&self) -> usize {
        self.junctions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.junctions.is_empty()
    }

    pub fn contains(&self, junction: &Junction) -> bool {
        self.junctions.contains(junction)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Junction> {
        self.junctions.iter()
    }

    /// Set union; duplicates collapse.
    pub fn merge(&mut self, other: JunctionSet) {
        self.junctions.extend(other.junctions);
    }

    /// Drop junctions whose span exceeds the given bound. Distant pairs are
    /// overwhelmingly mapping artifacts rather than real splice events.
    pub fn filter_by_distance(self, max_span: u64) -> JunctionSet {
        self.junctions
            .into_iter()
            .filter(|j| j.span() <= max_span)
            .collect()
    }

    /// Read a junction set from its tab-separated representation.
    pub fn from_junctions_file(path: &Path) -> Result<JunctionSet> {
        let reader = BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        );
        let mut junctions = JunctionSet::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let junction = parse_junction_line(&line)
                .with_context(|| format!("{}:{}", path.display(), number + 1))?;
            junctions.insert(junction);
        }
        Ok(junctions)
    }

    /// Persist as one tab-separated triple per line, in set order.
    pub fn write_junctions(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        );
        for j in &self.junctions {
            writeln!(writer, "{}\t{}\t{}", j.sequence, j.donor, j.acceptor)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl FromIterator<Junction> for JunctionSet {
    fn from_iter<I: IntoIterator<Item = Junction>>(iter: I) -> JunctionSet {
        JunctionSet {
            junctions: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for JunctionSet {
    type Item = Junction;
    type IntoIter = std::collections::btree_set::IntoIter<Junction>;

    fn into_iter(self) -> Self::IntoIter {
        self.junctions.into_iter()
    }
}

fn parse_junction_line(line: &str) -> Result<Junction> {
    let fields = line.split('\t').collect_vec();
    ensure!(
        fields.len() == 3,
        "expected 3 tab-separated fields, found {}",
        fields.len()
    );
    Ok(Junction {
        sequence: fields[0].to_string(),
        donor: fields[1]
            .parse()
            .with_context(|| format!("invalid donor position '{}'", fields[1]))?,
        acceptor: fields[2]
            .parse()
            .with_context(|| format!("invalid acceptor position '{}'", fields[2]))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn junction(name: &str, donor: u64, acceptor: u64) -> Junction {
        Junction::new(name, donor, acceptor)
    }

    #[test]
    fn test_merge_collapses_duplicates() {
        let mut annotated: JunctionSet = [junction("chr1", 100, 200), junction("chr1", 400, 900)]
            .into_iter()
            .collect();
        let denovo: JunctionSet = [junction("chr1", 400, 900), junction("chr2", 10, 50)]
            .into_iter()
            .collect();

        annotated.merge(denovo);
        assert_eq!(annotated.len(), 3);
        assert!(annotated.contains(&junction("chr1", 100, 200)));
        assert!(annotated.contains(&junction("chr1", 400, 900)));
        assert!(annotated.contains(&junction("chr2", 10, 50)));
    }

    #[test]
    fn test_filter_by_distance() {
        let junctions: JunctionSet = [
            junction("chr1", 1_000, 401_000),
            junction("chr1", 1_000, 601_000),
            junction("chr2", 700_000, 100_000),
        ]
        .into_iter()
        .collect();

        let close = junctions.filter_by_distance(500_000);
        assert_eq!(close.len(), 1);
        assert!(close.contains(&junction("chr1", 1_000, 401_000)));
    }

    #[test]
    fn test_deterministic_order() {
        let junctions: JunctionSet = [
            junction("chr2", 5, 10),
            junction("chr1", 9, 12),
            junction("chr1", 2, 4),
        ]
        .into_iter()
        .collect();
        let ordered = junctions.iter().map(|j| j.donor).collect_vec();
        assert_eq!(ordered, vec![2, 9, 5]);
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.junctions");
        let junctions: JunctionSet = [junction("chr1", 100, 200), junction("chrX", 7, 90)]
            .into_iter()
            .collect();

        junctions.write_junctions(&path).unwrap();
        let read = JunctionSet::from_junctions_file(&path).unwrap();
        assert_eq!(read, junctions);
    }

    #[test]
    fn test_parse_error_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.junctions");
        std::fs::write(&path, "chr1\t100\t200\nchr2\tnot-a-number\t5\n").unwrap();

        let err = JunctionSet::from_junctions_file(&path).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("bad.junctions:2"), "{message}");
    }
}
