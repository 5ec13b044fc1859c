use anyhow::{bail, Context, Result};
use poststrat::{
    config::Config,
    fetch::CensusClient,
    process::{self, BuildResult, CrossTabBuilder, RawRecord},
    schema::RECODE_SPEC,
    store::CellStore,
};
use serde::Serialize;
use std::{env, path::PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const USAGE: &str = "usage:
  poststrat build <YEAR> [--input <CSV>] [--replace]
  poststrat stats <YEAR>
  poststrat district <YEAR> <ST-NN>
  poststrat delete <YEAR>
  poststrat vacuum";

#[derive(Debug, PartialEq)]
enum Command {
    Build {
        year: u16,
        input: Option<PathBuf>,
        replace: bool,
    },
    Stats { year: u16 },
    District { year: u16, district: String },
    Delete { year: u16 },
    Vacuum,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    // ─── logging ─────────────────────────────────────────────────────
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    RECODE_SPEC.validate().context("recode tables are inconsistent")?;

    let command = parse_args(env::args().skip(1))?;
    let store = CellStore::open(&config.data_dir, config.store.batch_size)?;
    info!(data_dir = %config.data_dir.display(), ?command, "startup");

    match command {
        Command::Build {
            year,
            input,
            replace,
        } => {
            // fail before any network work; the stored year is only touched
            // once a replacement build exists
            if !replace && store.has_year(year)? {
                bail!("year {} is already stored; pass --replace to rebuild it", year);
            }

            let records: Vec<RawRecord> = match input {
                Some(path) => process::load_raw_csv(&path)?,
                None => {
                    if config.census.api_key.is_none() {
                        warn!("no CENSUS_API_KEY set; requests may be rate limited");
                    }
                    CensusClient::new(config.census.clone())?
                        .fetch_year(&RECODE_SPEC, year)
                        .await?
                }
            };

            let result = build_and_store(&store, year, &records, replace)?;
            print_json(&result)?;
        }
        Command::Stats { year } => print_json(&store.year_stats(year)?)?,
        Command::District { year, district } => {
            let cells = store.cells_for_district(year, &district.to_ascii_uppercase())?;
            if cells.is_empty() {
                warn!(year, %district, "no cells stored for district");
            }
            print_json(&cells)?;
        }
        Command::Delete { year } => {
            let removed = store.delete_year(year)?;
            info!(year, removed, "deleted year");
        }
        Command::Vacuum => store.vacuum()?,
    }
    Ok(())
}

/// Build `year` from `records` and store it. Nothing stored changes unless
/// the build succeeds.
fn build_and_store(
    store: &CellStore,
    year: u16,
    records: &[RawRecord],
    replace: bool,
) -> Result<BuildResult> {
    let build = CrossTabBuilder::new(&RECODE_SPEC).build(year, records)?;
    let summary = store.store_year(year, &build.cells, replace)?;
    info!(
        year,
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        skipped = build.result.districts_skipped,
        "build complete"
    );
    Ok(build.result)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_year(arg: Option<String>) -> Result<u16> {
    let raw = arg.with_context(|| format!("missing <YEAR>\n{}", USAGE))?;
    raw.parse()
        .with_context(|| format!("invalid year {:?}", raw))
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Command> {
    let mut args = args.into_iter();
    let command = match args.next().as_deref() {
        Some("build") => {
            let year = parse_year(args.next())?;
            let mut input = None;
            let mut replace = false;
            while let Some(flag) = args.next() {
                match flag.as_str() {
                    "--input" => {
                        let path = args.next().context("--input needs a path")?;
                        input = Some(PathBuf::from(path));
                    }
                    "--replace" => replace = true,
                    other => bail!("unknown flag {:?}\n{}", other, USAGE),
                }
            }
            Command::Build {
                year,
                input,
                replace,
            }
        }
        Some("stats") => Command::Stats {
            year: parse_year(args.next())?,
        },
        Some("district") => Command::District {
            year: parse_year(args.next())?,
            district: args
                .next()
                .with_context(|| format!("missing <ST-NN>\n{}", USAGE))?,
        },
        Some("delete") => Command::Delete {
            year: parse_year(args.next())?,
        },
        Some("vacuum") => Command::Vacuum,
        Some(other) => bail!("unknown command {:?}\n{}", other, USAGE),
        None => bail!("{}", USAGE),
    };
    if let Some(extra) = args.next() {
        bail!("unexpected argument {:?}\n{}", extra, USAGE);
    }
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_parse_build() {
        assert_eq!(
            parse_args(args("build 2022 --input raw.csv --replace")).unwrap(),
            Command::Build {
                year: 2022,
                input: Some(PathBuf::from("raw.csv")),
                replace: true
            }
        );
        assert_eq!(
            parse_args(args("build 2020")).unwrap(),
            Command::Build {
                year: 2020,
                input: None,
                replace: false
            }
        );
    }

    #[test]
    fn test_parse_other_commands() {
        assert_eq!(
            parse_args(args("district 2022 TX-32")).unwrap(),
            Command::District {
                year: 2022,
                district: "TX-32".into()
            }
        );
        assert_eq!(parse_args(args("vacuum")).unwrap(), Command::Vacuum);
        assert_eq!(
            parse_args(args("delete 2021")).unwrap(),
            Command::Delete { year: 2021 }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(args("")).is_err());
        assert!(parse_args(args("stats")).is_err());
        assert!(parse_args(args("stats twenty")).is_err());
        assert!(parse_args(args("build 2022 --input")).is_err());
        assert!(parse_args(args("build 2022 --force")).is_err());
        assert!(parse_args(args("vacuum now")).is_err());
    }

    fn tx32(white: u64) -> RawRecord {
        RawRecord::new("48", "32")
            .with_count("B01001_007E", 1000)
            .with_count("B03002_003E", white)
            .with_count("B03002_012E", 1000)
            .with_count("B15003_022E", 1500)
    }

    #[test]
    fn test_failed_rebuild_keeps_stored_year() {
        let tmp = tempdir().unwrap();
        let store = CellStore::open(tmp.path(), 1000).unwrap();
        build_and_store(&store, 2022, &[tx32(1000)], false).unwrap();
        let before = store.cells_for_year(2022).unwrap();
        assert_eq!(before.len(), 2);

        // empty input fails the build; the stored year is untouched
        assert!(build_and_store(&store, 2022, &[], true).is_err());
        assert_eq!(store.cells_for_year(2022).unwrap(), before);

        // without --replace a populated year is refused
        assert!(build_and_store(&store, 2022, &[tx32(3000)], false).is_err());
        assert_eq!(store.cells_for_year(2022).unwrap(), before);
    }

    #[test]
    fn test_replace_swaps_in_new_build() {
        let tmp = tempdir().unwrap();
        let store = CellStore::open(tmp.path(), 1000).unwrap();
        build_and_store(&store, 2022, &[tx32(1000)], false).unwrap();

        let result = build_and_store(&store, 2022, &[tx32(3000)], true).unwrap();
        assert_eq!(result.cells_generated, 2);
        let white: u64 = store
            .cells_for_year(2022)
            .unwrap()
            .iter()
            .filter(|c| c.race_eth == poststrat::schema::RaceEth::White)
            .map(|c| c.population)
            .sum();
        // 1000 × 3000/4000
        assert_eq!(white, 750);
    }
}
