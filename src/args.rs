use clap::Parser;

/// This is a program to compare the candidates of an election, topic by topic.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The file describing the comparison to run (JSON).
    /// For more information about the file format, read the manual of the compare_engine crate.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,
    /// (file path) A reference file containing the expected output in JSON format. If provided, votecompare will
    /// check that the computed output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary will be written in JSON format to the given
    /// location. Otherwise it is printed on the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) The JSON file holding the topics, candidates and proposals. Setting this option
    /// overrides the data sources of the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// The id of the election.
    #[clap(short, long, value_parser)]
    pub election: Option<String>,

    /// The topic to compare the candidates on (the value of a topic, as listed with --mode topics).
    #[clap(short, long, value_parser)]
    pub topic: Option<String>,

    /// (list of comma-separated values or not specified) The candidates to compare. All the candidates of the
    /// election are used when not specified.
    #[clap(long, value_parser, use_value_delimiter = true)]
    pub candidates: Option<Vec<String>>,

    /// (repeatable) A winner for a tournament match, written <round>-<match>=<candidate>. Example: 0-1=c3
    #[clap(short, long, value_parser)]
    pub decision: Vec<String>,

    /// (default compare) What to compute: topics, compare or tournament.
    #[clap(short, long, value_parser)]
    pub mode: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
