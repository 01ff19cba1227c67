//! Built-in benchmark suites for the genome workbench assistant.
//!
//! Suites are declared in dependency order: data loading first, since the
//! navigation and analysis tests assume a genome is open.

use crate::config::ConfigProvider;
use crate::error::RegistryError;

use super::definition::{
    Category, Complexity, ExpectedCall, ExpectedValue, Expectation, FieldType, TestDefinition,
};
use super::registry::{Suite, SuiteRegistry};

/// Tool allow-list for the workbench assistant, used to configure the
/// extractor.
pub fn known_tools() -> Vec<String> {
    [
        "load_fasta",
        "search_gene_by_name",
        "navigate_to_position",
        "compute_gc",
        "reverse_complement",
        "export_region",
        "blast_search",
        "alphafold_search",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Builds a registry holding every built-in suite.
///
/// File paths in `load_*` instructions are interpolated from the configured
/// data directory. When no directory is configured the literal `{data_dir}`
/// token is left in place so suites can still be listed; a run fails fast on
/// the same missing directory before anything is dispatched.
pub fn builtin_registry(config: &dyn ConfigProvider) -> Result<SuiteRegistry, RegistryError> {
    let data_dir = config
        .default_directory()
        .map(|d| d.display().to_string())
        .unwrap_or_else(|_| "{data_dir}".to_string());

    let mut registry = SuiteRegistry::new();
    registry.register(data_loading(&data_dir))?;
    registry.register(navigation())?;
    registry.register(sequence_analysis())?;
    registry.register(external_database())?;
    registry.register(reporting())?;
    Ok(registry)
}

fn data_loading(data_dir: &str) -> Suite {
    let fasta = format!("{}/ecoli_k12.fasta", data_dir);
    Suite::new("data_loading", "Data loading")
        .with_description("Opening genome files; runs first so later suites have a genome")
        .add_test(
            TestDefinition::new(
                "load-001",
                "",
                format!("Load the FASTA file at {}.", fasta),
                Expectation::call(
                    ExpectedCall::new("load_fasta")
                        .with_param("path", ExpectedValue::string(&fasta)),
                ),
                5,
            )
            .with_name("Load E. coli K-12 genome")
            .with_category(Category::DataLoading)
            .with_complexity(Complexity::Simple),
        )
        .add_test(
            TestDefinition::new(
                "load-002",
                "",
                format!(
                    "Open {} and tell me how many sequences it contains.",
                    fasta
                ),
                Expectation::call(ExpectedCall::new("load_fasta")),
                5,
            )
            .with_name("Load and summarize")
            .with_category(Category::DataLoading),
        )
}

fn navigation() -> Suite {
    Suite::new("navigation", "Navigation")
        .with_description("Gene lookups and coordinate jumps")
        .add_test(
            TestDefinition::new(
                "nav-001",
                "",
                "Search for the gene \"lacZ\".",
                Expectation::call(
                    ExpectedCall::new("search_gene_by_name")
                        .with_param("name", ExpectedValue::string("lacZ")),
                ),
                5,
            )
            .with_name("Find lacZ")
            .with_category(Category::Navigation)
            .with_complexity(Complexity::Simple),
        )
        .add_test(
            TestDefinition::new(
                "nav-002",
                "",
                "Do a case-sensitive search for the gene \"araA\".",
                Expectation::call(
                    ExpectedCall::new("search_gene_by_name")
                        .with_param("name", ExpectedValue::string("araA"))
                        .with_param("case_sensitive", ExpectedValue::Value(serde_json::json!(true))),
                ),
                5,
            )
            .with_name("Case-sensitive araA search")
            .with_category(Category::Navigation),
        )
        .add_test(
            TestDefinition::new(
                "nav-003",
                "",
                "Navigate to position 365,529 on COLI-K12.",
                Expectation::call(
                    ExpectedCall::new("navigate_to_position")
                        .with_param("chromosome", ExpectedValue::string("COLI-K12"))
                        .with_param("position", ExpectedValue::int(365_529)),
                ),
                5,
            )
            .with_name("Jump to araA locus")
            .with_category(Category::Navigation),
        )
}

fn sequence_analysis() -> Suite {
    Suite::new("sequence_analysis", "Sequence analysis")
        .with_description("GC content, reverse complements, codon reporting")
        .add_test(
            TestDefinition::new(
                "seq-001",
                "",
                "Compute the GC content between positions 365,529 and 367,044.",
                Expectation::call(
                    ExpectedCall::new("compute_gc")
                        .with_param("start", ExpectedValue::int(365_529))
                        .with_param("end", ExpectedValue::int(367_044)),
                ),
                5,
            )
            .with_name("GC content of araA")
            .with_category(Category::SequenceAnalysis),
        )
        .add_test(
            TestDefinition::new(
                "seq-002",
                "",
                "Give me the reverse complement of the current selection.",
                Expectation::call(ExpectedCall::new("reverse_complement")),
                5,
            )
            .with_name("Reverse complement")
            .with_category(Category::SequenceAnalysis)
            .with_complexity(Complexity::Simple),
        )
        .add_test(
            TestDefinition::new(
                "seq-003",
                "",
                "Describe the codon usage of the araA gene in detail, covering GC bias \
                 and any rare codons you notice.",
                Expectation::TextAnalysis {
                    min_words: 50,
                    required_keywords: vec![
                        "codon".to_string(),
                        "araA".to_string(),
                        "GC".to_string(),
                    ],
                    require_structure: false,
                },
                5,
            )
            .with_name("Codon usage narrative")
            .with_category(Category::SequenceAnalysis)
            .with_complexity(Complexity::Complex),
        )
        .add_test(
            TestDefinition::new(
                "seq-004",
                "",
                "Report the GC statistics of the current region as a JSON object with \
                 fields gc_percent and length.",
                Expectation::JsonOutput {
                    required_fields: vec!["gc_percent".to_string(), "length".to_string()],
                    field_types: [
                        ("gc_percent".to_string(), FieldType::Number),
                        ("length".to_string(), FieldType::Number),
                    ]
                    .into_iter()
                    .collect(),
                },
                5,
            )
            .with_name("GC stats as JSON")
            .with_category(Category::SequenceAnalysis),
        )
}

fn external_database() -> Suite {
    Suite::new("external_database", "External databases")
        .with_description("BLAST and structure lookups")
        .add_test(
            TestDefinition::new(
                "ext-001",
                "",
                "Export the current region and run a BLAST search against it.",
                Expectation::Workflow {
                    expected_steps: Some(3),
                    required_tools: vec![
                        "export_region".to_string(),
                        "blast_search".to_string(),
                    ],
                    min_tool_calls: 2,
                },
                10,
            )
            .with_name("Export then BLAST")
            .with_category(Category::ExternalDatabase)
            .with_complexity(Complexity::Complex),
        )
        .add_test(
            TestDefinition::new(
                "ext-002",
                "",
                "Look up the AlphaFold structure for araA.",
                Expectation::call(
                    ExpectedCall::new("alphafold_search")
                        .with_param("query", ExpectedValue::string("araA")),
                ),
                5,
            )
            .with_name("AlphaFold lookup")
            .with_category(Category::ExternalDatabase),
        )
}

fn reporting() -> Suite {
    Suite::new("reporting", "Reporting")
        .with_description("Region exports and written summaries")
        .add_test(
            TestDefinition::new(
                "rep-001",
                "",
                "Export positions 365,529 to 367,044 as FASTA.",
                Expectation::call(
                    ExpectedCall::new("export_region")
                        .with_param("start", ExpectedValue::int(365_529))
                        .with_param("end", ExpectedValue::int(367_044))
                        .with_param("format", ExpectedValue::string("fasta")),
                ),
                5,
            )
            .with_name("FASTA export")
            .with_category(Category::Reporting),
        )
        .add_test(
            TestDefinition::new(
                "rep-002",
                "",
                "Write a structured summary of the loaded genome: one section on \
                 assembly statistics and one on notable genes.",
                Expectation::TextAnalysis {
                    min_words: 30,
                    required_keywords: vec!["genome".to_string()],
                    require_structure: true,
                },
                5,
            )
            .with_name("Genome summary")
            .with_category(Category::Reporting)
            .with_complexity(Complexity::Complex),
        )
}
