use clap::{Subcommand, ValueEnum};
use connectors::target::ShopSection;

#[derive(Subcommand)]
pub enum Commands {
    /// Run one chunk of a step and store the returned token
    RunStep {
        /// Step name, e.g. "products" or "order_details"
        step: String,

        #[arg(long, help = "Print the step report as JSON")]
        json: bool,
    },
    /// Run every configured step to completion, chunk after chunk
    Migrate {
        #[arg(long, help = "Print the final reports as JSON")]
        json: bool,
    },
    /// Delete imported shop data and the mappings pointing at it
    Clear {
        #[arg(long, value_enum, help = "Sections to wipe (default: all)")]
        section: Vec<SectionArg>,

        #[arg(long, help = "Keep the stored progress tokens")]
        keep_tokens: bool,
    },
    /// Show the stored progress of the configured steps
    Progress {
        #[arg(
            long,
            help = "If set, prints the progress information as JSON instead of a table"
        )]
        json: bool,
    },
    /// Check that the configured source and target are reachable
    TestConn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SectionArg {
    Articles,
    Categories,
    Customers,
    Orders,
}

impl From<SectionArg> for ShopSection {
    fn from(arg: SectionArg) -> Self {
        match arg {
            SectionArg::Articles => ShopSection::Articles,
            SectionArg::Categories => ShopSection::Categories,
            SectionArg::Customers => ShopSection::Customers,
            SectionArg::Orders => ShopSection::Orders,
        }
    }
}

/// Requested sections, or every section when none was given.
pub fn sections(args: &[SectionArg]) -> Vec<ShopSection> {
    if args.is_empty() {
        return ShopSection::ALL.to_vec();
    }
    args.iter().map(|a| ShopSection::from(*a)).collect()
}
