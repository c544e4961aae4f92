//! Feature kinds, strands and labels shared by both pipeline phases.

use clap::ValueEnum;

/// Read-end feature examined by the classifier.
///
/// The letter gives the side of the read the end sits on (`l`eft or `r`ight
/// in reference coordinates), the digit the transcript end it represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum FeatureKind {
    #[value(name = "l5")]
    L5,
    #[value(name = "r5")]
    R5,
    #[value(name = "l3")]
    L3,
    #[value(name = "r3")]
    R3,
    #[value(name = "in")]
    Intron,
}

/// Order in which the positions of one contig are scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOrder {
    Ascending,
    Descending,
}

/// Strand orientation
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    #[default]
    Forward,
    Reverse,
}

impl Strand {
    pub fn as_char(self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Strand::Forward),
            '-' => Some(Strand::Reverse),
            _ => None,
        }
    }

    /// +1 for forward, -1 for reverse
    pub fn sign(self) -> i64 {
        match self {
            Strand::Forward => 1,
            Strand::Reverse => -1,
        }
    }
}

impl FeatureKind {
    pub fn code(self) -> &'static str {
        match self {
            FeatureKind::L5 => "l5",
            FeatureKind::R5 => "r5",
            FeatureKind::L3 => "l3",
            FeatureKind::R3 => "r3",
            FeatureKind::Intron => "in",
        }
    }

    /// Left-anchored kinds keep the leftmost representative of a window.
    pub fn scan_order(self) -> ScanOrder {
        match self {
            FeatureKind::L5 | FeatureKind::L3 => ScanOrder::Ascending,
            FeatureKind::R5 | FeatureKind::R3 | FeatureKind::Intron => ScanOrder::Descending,
        }
    }

    pub fn strand(self) -> Strand {
        match self {
            FeatureKind::R5 | FeatureKind::L3 => Strand::Reverse,
            _ => Strand::Forward,
        }
    }

    pub fn is_three_prime(self) -> bool {
        matches!(self, FeatureKind::L3 | FeatureKind::R3)
    }

    /// Vicinity vectors are stored "toward the transcript"; on the reverse
    /// strand that means decreasing coordinates.
    pub fn reverses_vicinity(self) -> bool {
        matches!(self, FeatureKind::R5 | FeatureKind::L3)
    }

    pub fn site_label(self) -> &'static str {
        if self.is_three_prime() {
            SiteKind::Tes.label()
        } else {
            SiteKind::Tss.label()
        }
    }

    pub fn artifact_label(self) -> &'static str {
        if self.is_three_prime() {
            SiteKind::Tes.artifact_label()
        } else {
            SiteKind::Tss.artifact_label()
        }
    }

    /// Inserted before `.tsv` when deriving the classified table's file name
    pub fn output_suffix(self) -> &'static str {
        match self {
            FeatureKind::L3 | FeatureKind::R3 => "_tes",
            FeatureKind::L5 | FeatureKind::R5 => "_tss",
            FeatureKind::Intron => "tron",
        }
    }
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Transcript end type merged in the second phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SiteKind {
    #[value(name = "tss")]
    Tss,
    #[value(name = "tes")]
    Tes,
}

impl SiteKind {
    pub fn label(self) -> &'static str {
        match self {
            SiteKind::Tss => "tss",
            SiteKind::Tes => "tes",
        }
    }

    pub fn artifact_label(self) -> &'static str {
        match self {
            SiteKind::Tss => "tss template-switching",
            SiteKind::Tes => "template-switching",
        }
    }

    /// Feature kinds classified for the (forward, reverse) strand
    pub fn feature_kinds(self) -> (FeatureKind, FeatureKind) {
        match self {
            SiteKind::Tss => (FeatureKind::L5, FeatureKind::R5),
            SiteKind::Tes => (FeatureKind::R3, FeatureKind::L3),
        }
    }

    /// Whether the leftmost of the tied best records represents a cluster
    /// on `strand`. Otherwise the rightmost one does.
    pub fn prefers_leftmost(self, strand: Strand) -> bool {
        matches!(
            (self, strand),
            (SiteKind::Tes, Strand::Reverse) | (SiteKind::Tss, Strand::Forward)
        )
    }
}

impl std::fmt::Display for SiteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of classification for one candidate position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    /// Not qualified, never evaluated
    None,
    Site(FeatureKind),
    Artifact(FeatureKind),
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::None => "",
            Label::Site(kind) => kind.site_label(),
            Label::Artifact(kind) => kind.artifact_label(),
        }
    }
}

/// Contig and coordinate of a read-end pileup
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionKey {
    pub contig: String,
    pub pos: i64,
}

impl PositionKey {
    pub fn new(contig: impl Into<String>, pos: i64) -> Self {
        PositionKey {
            contig: contig.into(),
            pos,
        }
    }
}

/// Raw observation: number of reads ending at a position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionCount {
    pub key: PositionKey,
    pub count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_directions() {
        assert_eq!(FeatureKind::L5.scan_order(), ScanOrder::Ascending);
        assert_eq!(FeatureKind::L3.scan_order(), ScanOrder::Ascending);
        assert_eq!(FeatureKind::R3.scan_order(), ScanOrder::Descending);
        assert_eq!(FeatureKind::Intron.scan_order(), ScanOrder::Descending);

        assert_eq!(FeatureKind::L3.strand(), Strand::Reverse);
        assert_eq!(FeatureKind::R5.strand(), Strand::Reverse);
        assert_eq!(FeatureKind::R3.strand(), Strand::Forward);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Label::Site(FeatureKind::R3).as_str(), "tes");
        assert_eq!(Label::Artifact(FeatureKind::L3).as_str(), "template-switching");
        assert_eq!(Label::Site(FeatureKind::L5).as_str(), "tss");
        assert_eq!(
            Label::Artifact(FeatureKind::R5).as_str(),
            "tss template-switching"
        );
        assert_eq!(Label::None.as_str(), "");
    }

    #[test]
    fn test_site_kind_pick_side() {
        assert!(SiteKind::Tes.prefers_leftmost(Strand::Reverse));
        assert!(!SiteKind::Tes.prefers_leftmost(Strand::Forward));
        assert!(SiteKind::Tss.prefers_leftmost(Strand::Forward));
        assert!(!SiteKind::Tss.prefers_leftmost(Strand::Reverse));
    }
}
