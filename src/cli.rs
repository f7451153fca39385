use crate::period::Period;

/// Structure representing command-line arguments.
#[derive(Debug)]
pub struct Args {
    pub input: std::path::PathBuf,
    pub output: Option<std::path::PathBuf>,
    pub periods: Vec<Period>,
    pub threads: Option<usize>,
    pub strict: bool,
    pub verbose: bool,
}

/// Command-line arguments parser using Clap.
///
/// Supports an input file or directory, one or more periods, an optional
/// output directory and threading.
impl Args {
    /// Parses command-line arguments of the current process.
    ///
    /// # Errors
    /// * Exits with a usage message if arguments are missing or invalid.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    fn from_matches(matches: &clap::ArgMatches) -> Self {
        let mut periods: Vec<Period> = matches
            .get_many::<Period>("period")
            .map(|values| values.copied().collect())
            .unwrap_or_else(|| vec![Period::Weekly]);
        let mut seen = std::collections::HashSet::new();
        periods.retain(|p| seen.insert(*p));

        Args {
            input: matches
                .get_one::<std::path::PathBuf>("input")
                .cloned()
                .unwrap_or_default(),
            output: matches.get_one::<std::path::PathBuf>("output").cloned(),
            periods,
            threads: matches.get_one::<usize>("threads").cloned(),
            strict: matches.get_flag("strict"),
            verbose: matches.get_flag("verbose"),
        }
    }
}

/// Builds the clap command definition.
pub fn command() -> clap::Command {
    clap::Command::new("stock_period_averages")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Average opening and closing stock prices by week, month or year")
        .arg(
            clap::Arg::new("input")
                .short('i')
                .long("input")
                .help("Path to a CSV file or a directory of CSV files (Date,Fermeture,Ouverture,Max,Min)")
                .required(true)
                .num_args(1)
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::Arg::new("period")
            .short('p')
            .long("period")
            .help("Aggregation period, may be repeated. Available: Weekly, Monthly, Yearly")
            .num_args(1)
            .action(clap::ArgAction::Append)
            .default_value("Weekly")
            .value_parser(clap::builder::ValueParser::new(parse_period)),
        )
        .arg(
            clap::Arg::new("output")
            .short('o')
            .long("output")
            .help("Directory to write <file>_<period>.csv results to (default: print tables)")
            .num_args(1)
            .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::Arg::new("threads")
            .short('t')
            .long("threads")
            .help("Number of threads to use (default: all available)")
            .num_args(1)
            .value_parser(clap::builder::ValueParser::new(parse_usize_positive)),
        )
        .arg(
            clap::Arg::new("strict")
            .long("strict")
            .help("Fail a file that has rows with an invalid date or price")
            .action(clap::ArgAction::SetTrue)
        )
        .arg(
            clap::Arg::new("verbose")
            .short('v')
            .long("verbose")
            .help("Enable debug logging on stderr")
            .action(clap::ArgAction::SetTrue)
        )
}

fn parse_period(s: &str) -> Result<Period, String> {
    s.parse::<Period>()
}

/// Validates that the number of threads is a positive integer.
///
/// # Arguments
/// * `s` - String representation of the number of threads.
///
/// # Returns
/// * `Result<usize>` - Validated number of threads.
fn parse_usize_positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("Must be a positive integer".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("Not a valid number: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_from(args: &[&str]) -> Result<Args, clap::Error> {
        command()
            .try_get_matches_from(args)
            .map(|m| Args::from_matches(&m))
    }

    #[test]
    fn test_defaults() {
        let args = parse_from(&["app", "-i", "prices.csv"]).unwrap();
        assert_eq!(args.input, std::path::PathBuf::from("prices.csv"));
        assert_eq!(args.periods, vec![Period::Weekly]);
        assert_eq!(args.output, None);
        assert_eq!(args.threads, None);
        assert!(!args.strict);
        assert!(!args.verbose);
    }

    #[test]
    fn test_repeated_periods_are_deduplicated() {
        let args = parse_from(&[
            "app", "-i", "data", "-p", "yearly", "--period", "Monthly", "-p", "Yearly",
        ])
        .unwrap();
        assert_eq!(args.periods, vec![Period::Yearly, Period::Monthly]);
    }

    #[test]
    fn test_rejects_unknown_period() {
        assert!(parse_from(&["app", "-i", "data", "-p", "Daily"]).is_err());
    }

    #[test]
    fn test_input_is_required() {
        assert!(parse_from(&["app", "-p", "Monthly"]).is_err());
    }

    #[test]
    fn test_flags_and_output() {
        let args = parse_from(&["app", "-i", "d", "-o", "out", "-t", "2", "--strict", "-v"]).unwrap();
        assert_eq!(args.output, Some(std::path::PathBuf::from("out")));
        assert_eq!(args.threads, Some(2));
        assert!(args.strict);
        assert!(args.verbose);
    }

    #[test]
    fn test_parse_usize_positive() {
        assert_eq!(parse_usize_positive("4"), Ok(4));
        assert!(parse_usize_positive("0").is_err());
        assert!(parse_usize_positive("four").is_err());
    }
}
