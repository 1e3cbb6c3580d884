//! Command-line interface definitions and argument parsing

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::client::{ClientConfig, DEFAULT_ENDPOINT};
use crate::model::{CabinClass, CustomerAttributes, FlightType};
use crate::summary::DEFAULT_BINS;

/// Score customers against the price-sensitivity prediction service
#[derive(Parser, Debug)]
#[command(name = "pricesense", author, version, about, long_about = None)]
pub struct Args {
    /// URL of the scoring endpoint
    #[arg(long, global = true, env = "PRICESENSE_API_URL", default_value = DEFAULT_ENDPOINT)]
    pub api_url: String,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "PRICESENSE_TIMEOUT", default_value = "10")]
    pub timeout: u64,

    /// Extra attempts for network errors and 5xx responses
    #[arg(long, global = true, default_value = "0")]
    pub retries: u32,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score a single customer
    Predict(PredictArgs),

    /// Score every row of an .xlsx or .csv file and write the results
    Batch {
        /// File with the nine input columns
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the scored table (.xlsx or .csv)
        #[arg(short, long, default_value = "predictions.xlsx")]
        output: PathBuf,

        /// Records scored concurrently
        #[arg(short, long, default_value = "1")]
        workers: usize,

        /// Rows of the input and result to print
        #[arg(long, default_value = "5")]
        preview: usize,
    },

    /// Summarize a scored file with Prediction and Probability columns
    Summarize {
        /// Scored .xlsx or .csv file
        #[arg(short, long)]
        input: PathBuf,

        /// Directory to write SVG charts into
        #[arg(long)]
        charts_dir: Option<PathBuf>,

        /// Number of probability histogram bins
        #[arg(long, default_value_t = DEFAULT_BINS)]
        bins: usize,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Customer attributes for a single prediction
#[derive(ClapArgs, Debug, Clone)]
pub struct PredictArgs {
    /// Total spent (USD)
    #[arg(long, default_value = "0.0")]
    pub total_spent: f64,

    /// Average order value (USD)
    #[arg(long, default_value = "0.0")]
    pub avg_order_value: f64,

    /// Average purchase frequency (per month)
    #[arg(long, default_value = "0.0")]
    pub avg_purchase_frequency: f64,

    /// Days since last purchase
    #[arg(long, default_value = "30")]
    pub days_since_last_purchase: u32,

    /// Share of orders placed with a coupon, between 0 and 1
    #[arg(long, default_value = "0.2")]
    pub discount_behavior: f64,

    /// Customer is a loyalty program member
    #[arg(long)]
    pub loyalty_member: bool,

    /// Days booked in advance
    #[arg(long, default_value = "14")]
    pub days_in_advance: u32,

    #[arg(long, value_enum, default_value_t = FlightType::Domestic)]
    pub flight_type: FlightType,

    #[arg(long, value_enum, default_value_t = CabinClass::Economy)]
    pub cabin_class: CabinClass,
}

impl PredictArgs {
    /// Unvalidated attributes; range checks happen when the record is built.
    pub fn to_attributes(&self) -> CustomerAttributes {
        CustomerAttributes {
            total_spent: self.total_spent,
            avg_order_value: self.avg_order_value,
            avg_purchase_frequency: self.avg_purchase_frequency,
            days_since_last_purchase: self.days_since_last_purchase,
            discount_behavior: self.discount_behavior,
            loyalty_program_member: self.loyalty_member,
            days_in_advance: self.days_in_advance,
            flight_type: self.flight_type,
            cabin_class: self.cabin_class,
        }
    }
}

impl Args {
    /// Client settings from the global options
    pub fn client_config(&self) -> crate::Result<ClientConfig> {
        if self.timeout == 0 {
            return Err(crate::Error::validation("timeout", "must be at least 1 second"));
        }

        Ok(ClientConfig {
            endpoint: self.api_url.clone(),
            timeout: Duration::from_secs(self.timeout),
            max_retries: self.retries,
            ..ClientConfig::default()
        })
    }

    /// Log filter: `PRICESENSE_LOG` wins, otherwise info (debug with `--verbose`).
    pub fn log_filter(&self) -> String {
        std::env::var("PRICESENSE_LOG").unwrap_or_else(|_| {
            if self.verbose {
                "pricesense=debug".to_string()
            } else {
                "pricesense=info".to_string()
            }
        })
    }
}
