use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "office", version, about = "The Office: persona chat and comedy server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override the config file path globally
    #[arg(short, long, global = true, default_value = "config.yaml")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    Serve,

    /// Chat with a persona in the terminal
    Chat {
        /// Persona id, e.g. morgan-freeman
        #[arg(short, long)]
        persona: String,

        /// Continue an existing session instead of starting a new one
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Fetch (or generate) a joke
    Joke {
        #[arg(long)]
        comedian: String,

        #[arg(long)]
        category: String,
    },

    /// List chat personas
    Personas,

    /// List comedians and their categories
    Comedians,
}
