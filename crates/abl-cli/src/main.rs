//! Ability engine command-line frontend
//!
//! Loads an actor, a sandbox map and options, runs one command against them
//! and optionally writes the actor back.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tracing::{debug, info};

use abl_core::talent::DescriptionError;
use abl_core::{
    AbilityError, AbilityOptions, ActorContext, DescriptionTable, GameRng, OptionsError,
    Position, SandboxWorld, ScriptedPrompt, ability_by_name, ability_description,
    activate_talent, describe_talent, talent_for_letter, your_talents,
};
use abl_save::{SaveError, load_actor, save_actor, save_exists};

/// Inspect and use abilities from the command line
#[derive(Parser, Debug)]
#[command(name = "abl")]
#[command(author, version, about = "Ability resolution and slot management", long_about = None)]
struct Args {
    /// Actor fixture (JSON)
    #[arg(long = "actor")]
    actor: Option<PathBuf>,

    /// Map fixture (JSON)
    #[arg(long = "world")]
    world: Option<PathBuf>,

    /// Options file (rc format)
    #[arg(long = "options")]
    options: Option<PathBuf>,

    /// Ability description table (JSON)
    #[arg(long = "descriptions")]
    descriptions: Option<PathBuf>,

    /// Random seed; random when absent
    #[arg(long = "seed")]
    seed: Option<u64>,

    /// Save file to load the actor from and write it back to
    #[arg(long = "save")]
    save: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List usable abilities with their hotkeys
    List,
    /// Describe an ability by hotkey or name
    Describe { key: String },
    /// Activate the ability on a hotkey
    Use {
        letter: char,
        /// Aim point as x,y
        #[arg(long = "target", value_parser = parse_position)]
        target: Option<Position>,
        /// Answer to every confirmation question
        #[arg(long = "confirm", value_enum, default_value_t = Answer::No)]
        confirm: Answer,
    },
    /// Exchange two hotkeys
    Swap { a: char, b: char },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Answer {
    Yes,
    No,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid fixture: {0}")]
    Fixture(#[from] serde_json::Error),

    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error(transparent)]
    Descriptions(#[from] DescriptionError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error(transparent)]
    Ability(#[from] AbilityError),
}

fn parse_position(s: &str) -> Result<Position, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y, found {s:?}"))?;
    let x = x.trim().parse::<i32>().map_err(|e| e.to_string())?;
    let y = y.trim().parse::<i32>().map_err(|e| e.to_string())?;
    Ok(Position::new(x, y))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Fixture first, then an existing save, then a fresh actor.
fn load_actor_from(args: &Args) -> Result<ActorContext, CliError> {
    if let Some(path) = &args.actor {
        return read_json(path);
    }
    if let Some(path) = &args.save
        && save_exists(path)
    {
        return Ok(load_actor(path)?);
    }
    Ok(ActorContext::default())
}

fn run(args: Args) -> Result<(), CliError> {
    let mut actor = load_actor_from(&args)?;
    let mut world = match &args.world {
        Some(path) => read_json(path)?,
        None => SandboxWorld::open(15, 15),
    };
    let options = match &args.options {
        Some(path) => AbilityOptions::load_from_file(path)?,
        None => AbilityOptions::default(),
    };
    let mut rng = match args.seed {
        Some(seed) => GameRng::new(seed),
        None => GameRng::from_entropy(),
    };
    debug!(actor = %actor.name, seed = rng.seed(), "session loaded");

    match args.command {
        Command::List => {
            println!("    {:<32}{:<30}Failure", "Ability", "Cost");
            for talent in your_talents(&mut actor, &world, &options, false) {
                let marker = if talent.usable { "" } else { "  (unavailable)" };
                println!("{}{marker}", describe_talent(&talent, &actor));
            }
        }
        Command::Describe { ref key } => {
            let mut chars = key.chars();
            let id = match (chars.next(), chars.next()) {
                (Some(letter), None) if letter.is_ascii_alphabetic() => {
                    talent_for_letter(&mut actor, &world, &options, letter)
                        .map(|talent| talent.which)
                        .ok_or_else(|| AbilityError::UnknownAbility(key.clone()))?
                }
                _ => ability_by_name(key).ok_or_else(|| AbilityError::UnknownAbility(key.clone()))?,
            };
            let descriptions = match &args.descriptions {
                Some(path) => DescriptionTable::load_from_file(path)?,
                None => DescriptionTable::new(),
            };
            println!("{}", ability_description(id, &actor, &descriptions));
        }
        Command::Use {
            letter,
            target,
            confirm,
        } => {
            let Some(talent) = talent_for_letter(&mut actor, &world, &options, letter) else {
                println!("You don't have that ability.");
                return Ok(());
            };
            let mut prompt = ScriptedPrompt::new().answering(confirm == Answer::Yes);
            if let Some(target) = target {
                prompt = prompt.with_target(target);
            }
            let result = activate_talent(
                &talent,
                &mut actor,
                &mut world,
                &options,
                &mut rng,
                &mut prompt,
            )?;
            for message in &result.messages {
                println!("{message}");
            }
            if result.turn_consumed {
                actor.elapsed_time += 1;
            }
            info!(outcome = ?result.outcome, turn = result.turn_consumed, "ability attempted");
        }
        Command::Swap { a, b } => {
            for line in actor.ability_letters.swap(a, b, false)? {
                println!("{line}");
            }
        }
    }

    if let Some(path) = &args.save {
        save_actor(&actor, path)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("abl: {e}");
            ExitCode::FAILURE
        }
    }
}
