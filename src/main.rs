use clap::Parser;
use log::info;
use rayon::ThreadPoolBuilder;
use std::io;
use std::num::NonZeroUsize;
use tswitch::classify::ClassifyConfig;
use tswitch::commands::classify::{run_classify, ClassifyPaths};
use tswitch::commands::merge::{run_merge, MergePaths};
use tswitch::commands::run::{run_pipeline, RunInputs};
use tswitch::feature::{FeatureKind, SiteKind};
use tswitch::merge::MergeConfig;

/// Common options shared between all commands
#[derive(Parser, Debug)]
struct CommonOpts {
    /// Number of threads for parallel processing.
    #[clap(short = 't', long, value_parser, default_value_t = NonZeroUsize::new(4).unwrap())]
    threads: NonZeroUsize,

    /// Verbosity level (0 = error, 1 = info, 2 = debug)
    #[clap(short, long, default_value = "1")]
    verbose: u8,
}

/// Thresholds and windows of the classification
#[derive(Parser, Debug)]
struct ClassifyOpts {
    /// The reference FASTA file, used to measure genomic poly-A runs.
    #[clap(short = 'r', long, value_parser)]
    reference: String,

    /// Table of minimal support ratios per poly-A length (needs a 'limit' column).
    #[clap(short = 'y', long, value_parser, default_value = "dict.tsv")]
    dictionary: String,

    /// Minimal number of reads ending at a position for it to be accepted.
    #[clap(short = 'm', long, value_parser, default_value_t = 2)]
    minimum: u32,

    /// Only one feature is expected within +/- this many nucleotides; positions
    /// with lesser support are considered derivatives of the major one.
    #[clap(short = 'b', long, value_parser, default_value_t = 10)]
    wobble: i64,

    /// Minimal ratio of the coverage that a feature has to reach.
    #[clap(long = "ratio", value_parser, default_value_t = 0.001)]
    ratio: f64,

    /// How many times more reads ending in the vicinity have to come from the
    /// all-hits file than from the template-switching file.
    #[clap(short = 'l', long, value_parser, default_value_t = 1.0)]
    multiplier: f64,

    /// Distance from the position where coverage is sampled. The direction is
    /// derived from the feature kind.
    #[clap(short = 'd', long, value_parser, default_value_t = 15)]
    distance: i64,

    /// Number of consecutive nucleotides averaged at `distance`, counted
    /// toward the position. Must not exceed `distance`.
    #[clap(short = 's', long, value_parser, default_value_t = 5)]
    cov_sample: i64,

    /// Half-width of the window where feature and all-hits read ends are compared.
    #[clap(short = 'g', long, value_parser, default_value_t = 10)]
    check_surroundings: i64,
}

impl ClassifyOpts {
    fn to_config(&self, feature: FeatureKind) -> ClassifyConfig {
        ClassifyConfig {
            feature,
            minimum: self.minimum,
            wobble: self.wobble,
            ratio: self.ratio,
            multiplier: self.multiplier,
            distance: self.distance,
            cov_sample: self.cov_sample,
            check_surroundings: self.check_surroundings,
        }
    }
}

/// Separate genuine transcript ends from template-switching artifacts.
#[derive(Parser, Debug)]
#[command(author, version, about, disable_help_subcommand = true)]
enum Args {
    /// Classify the read-end positions of one feature file
    Classify {
        #[clap(flatten)]
        common: CommonOpts,

        #[clap(flatten)]
        opts: ClassifyOpts,

        /// Coverage file with contig, position and depth columns.
        coverage_file: String,

        /// Read-end counts of the template-switching reads.
        feature_file: String,

        /// Feature kind of the file.
        #[clap(short = 'f', long, value_enum)]
        feature: FeatureKind,

        /// Read-end counts of all reads [default: feature file without '_ts']
        #[clap(short = 'a', long, value_parser)]
        all_hits: Option<String>,

        /// Output table [default: feature file with '_tes', '_tss' or 'tron' before '.tsv']
        #[clap(short = 'o', long, value_parser)]
        output: Option<String>,
    },
    /// Merge classified tables of both strands with an existing annotation
    Merge {
        #[clap(flatten)]
        common: CommonOpts,

        /// Path and prefix of the classified tables and of the annotation.
        prefix: String,

        /// Transcript end type to merge.
        #[clap(value_enum)]
        site: SiteKind,

        /// Records starting within this many nucleotides are merged.
        #[clap(short = 'w', long, value_parser, default_value_t = 10)]
        wobble: i64,
    },
    /// Classify both strands of a prefix and merge them
    Run {
        #[clap(flatten)]
        common: CommonOpts,

        #[clap(flatten)]
        opts: ClassifyOpts,

        /// Path and prefix of the count, coverage and annotation files.
        prefix: String,

        /// Transcript end type to process.
        #[clap(long, value_enum, default_value = "tes")]
        site: SiteKind,
    },
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    match args {
        Args::Classify {
            common,
            opts,
            coverage_file,
            feature_file,
            feature,
            all_hits,
            output,
        } => {
            initialize(&common)?;
            let paths = ClassifyPaths {
                coverage_file,
                feature_file,
                all_hits_file: all_hits,
                reference: opts.reference.clone(),
                dictionary: opts.dictionary.clone(),
                output,
            };
            if let Some(table) = run_classify(&paths, &opts.to_config(feature))? {
                info!("Classified table written to '{}'", table);
            }
        }
        Args::Merge {
            common,
            prefix,
            site,
            wobble,
        } => {
            initialize(&common)?;
            let config = MergeConfig {
                wobble,
                ..MergeConfig::new(site)
            };
            let paths = MergePaths::from_prefix(&prefix, site, wobble);
            run_merge(&paths, &config)?;
        }
        Args::Run {
            common,
            opts,
            prefix,
            site,
        } => {
            initialize(&common)?;
            let inputs = RunInputs {
                prefix,
                reference: opts.reference.clone(),
                dictionary: opts.dictionary.clone(),
            };
            // The feature kind is replaced per strand
            let classify = opts.to_config(site.feature_kinds().0);
            let merge = MergeConfig {
                wobble: opts.wobble,
                ..MergeConfig::new(site)
            };
            run_pipeline(&inputs, site, &classify, &merge)?;
        }
    }

    Ok(())
}

/// Initialize logging and the thread pool based on common options
fn initialize(common: &CommonOpts) -> io::Result<()> {
    env_logger::Builder::new()
        .filter_level(match common.verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    ThreadPoolBuilder::new()
        .num_threads(common.threads.into())
        .build_global()
        .map_err(|e| io::Error::other(format!("Failed to build thread pool: {}", e)))
}
