pub mod commands;

use futures_util::StreamExt;
use std::io::{self, Write};

use crate::app::AppState;
use crate::chat::{ChatTurn, RelayEvent};
use crate::cli::commands::Commands;
use crate::comedy::COMEDIANS;
use crate::config::AppConfig;

pub async fn run_cli(command: Commands, config_path: String) {
    let config = match AppConfig::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return;
        }
    };

    let state = match AppState::build(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            return;
        }
    };

    match command {
        Commands::Serve => {
            eprintln!("Serve is handled by the server entry point");
        }
        Commands::Personas => {
            println!("{:<22} | {:<22} | {}", "ID", "Name", "Archetype");
            println!("{:-<22}-+-{:-<22}-+-{:-<16}", "", "", "");
            for p in state.personas.all() {
                println!("{:<22} | {:<22} | {}", p.id, p.name, p.archetype);
            }
        }
        Commands::Comedians => {
            for c in COMEDIANS {
                println!("{} ({}) - {}", c.name, c.id, c.tagline);
                println!("    categories: {}", c.categories.join(", "));
            }
        }
        Commands::Joke { comedian, category } => match state.jokes.get_or_generate(&comedian, &category).await {
            Ok(outcome) => println!("{}", outcome.joke),
            Err(e) => eprintln!("Error: {}", e.user_message()),
        },
        Commands::Chat { persona, session } => {
            run_repl(&state, persona, session).await;
        }
    }
}

async fn run_repl(state: &AppState, persona_id: String, session: Option<String>) {
    let persona_name = match state.personas.get(&persona_id) {
        Some(p) => p.name.clone(),
        None => {
            if let Err(e) = state.personas.system_prompt(&persona_id) {
                eprintln!("{}", e.user_message());
                return;
            }
            persona_id.clone()
        }
    };

    let session_id = match session {
        Some(id) => id,
        None => match state.store.create_session(&persona_id).await {
            Ok(s) => s.id,
            Err(e) => {
                eprintln!("Failed to create session: {}", e);
                return;
            }
        },
    };

    println!("--- The Office ---");
    println!("Talking to {} (session {})", persona_name, session_id);
    println!("Type /exit to quit.");
    println!("------------------");

    loop {
        print!("\nYou> ");
        let _ = io::stdout().flush();

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let text = input.trim();

        if text.is_empty() {
            continue;
        }
        if text == "/exit" || text == "/quit" {
            break;
        }

        let turn = match ChatTurn::new(Some(session_id.clone()), Some(persona_id.clone()), Some(text.to_string())) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("{}", e.user_message());
                continue;
            }
        };

        let mut events = match state.relay.start(turn).await {
            Ok(events) => events,
            Err(e) => {
                eprintln!("Error: {}", e.user_message());
                continue;
            }
        };

        print!("{}> ", persona_name);
        let _ = io::stdout().flush();

        while let Some(event) = events.next().await {
            match event {
                RelayEvent::Content { content } => {
                    print!("{}", content);
                    let _ = io::stdout().flush();
                }
                RelayEvent::Error { error, details, .. } => {
                    eprintln!("\n{}: {}", error, details.unwrap_or_default());
                }
                RelayEvent::Done => {}
            }
        }
        println!();
    }
}
