use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pcsc::ShareMode;
use std::io::{self, BufRead, Write};

use crate::core::{
    helper::CardInputHelper,
    pin::PinSlot,
    reader::PcscReader,
    record::read_record,
    tlv::resolve_header,
    utils::{format_hex_dump, format_hex_spaced, parse_ef_id},
};

#[derive(Parser)]
#[command(name = "myna-reader")]
#[command(about = "Read identity records from the card input helper application of a My Number card")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Connection share mode
    #[arg(short, long, global = true, default_value = "shared")]
    pub mode: ShareModeArg,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List available PCSC readers
    List {
        /// Show detailed information about readers
        #[arg(short = 'l', long)]
        detailed: bool,
    },

    /// Read the identity number (verifies the standard PIN)
    MyNumber {
        /// Reader name or index (use 'list' to see available readers)
        reader: String,

        /// Standard PIN; prompted for when omitted
        #[arg(short, long)]
        pin: Option<String>,
    },

    /// Read name, address, birth date and sex (verifies the standard PIN)
    Attributes {
        /// Reader name or index
        reader: String,

        /// Standard PIN; prompted for when omitted
        #[arg(short, long)]
        pin: Option<String>,

        /// Print the attributes as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show remaining PIN attempts
    PinStatus {
        /// Reader name or index
        reader: String,

        /// PIN slot (standard, a, b); all slots when omitted
        #[arg(short, long)]
        slot: Option<PinSlot>,
    },

    /// Verify one PIN
    Verify {
        /// Reader name or index
        reader: String,

        /// PIN slot (standard, a, b)
        #[arg(short, long, default_value = "standard")]
        slot: PinSlot,

        /// PIN; prompted for when omitted
        #[arg(short, long)]
        pin: Option<String>,
    },

    /// Read one raw TLV record and print it as a hex dump
    Dump {
        /// Reader name or index
        reader: String,

        /// EF identifier in hex (e.g. "0002")
        file: String,

        /// Probe size used to resolve the record header
        #[arg(long, default_value_t = 16)]
        probe: usize,

        /// Verify this standard PIN before reading
        #[arg(short, long)]
        pin: Option<String>,
    },
}

#[derive(Clone, Debug)]
pub enum ShareModeArg {
    Shared,
    Exclusive,
}

impl std::str::FromStr for ShareModeArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shared" => Ok(ShareModeArg::Shared),
            "exclusive" => Ok(ShareModeArg::Exclusive),
            _ => Err(format!("Invalid share mode: {s}")),
        }
    }
}

impl From<ShareModeArg> for ShareMode {
    fn from(mode: ShareModeArg) -> Self {
        match mode {
            ShareModeArg::Shared => ShareMode::Shared,
            ShareModeArg::Exclusive => ShareMode::Exclusive,
        }
    }
}

pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.debug {
        log::LevelFilter::Debug
    } else if cli.verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .init();

    let mode = cli.mode;
    match cli.command {
        Commands::List { detailed } => cmd_list(detailed),
        Commands::MyNumber { reader, pin } => cmd_my_number(&reader, pin, mode),
        Commands::Attributes { reader, pin, json } => cmd_attributes(&reader, pin, json, mode),
        Commands::PinStatus { reader, slot } => cmd_pin_status(&reader, slot, mode),
        Commands::Verify { reader, slot, pin } => cmd_verify(&reader, slot, pin, mode),
        Commands::Dump {
            reader,
            file,
            probe,
            pin,
        } => cmd_dump(&reader, &file, probe, pin, mode),
    }
}

fn cmd_list(detailed: bool) -> Result<()> {
    let reader = PcscReader::new().context("Failed to initialize PCSC")?;

    let readers = reader.list_readers().context("Failed to list readers")?;

    if readers.is_empty() {
        println!("No PCSC readers found.");
        return Ok(());
    }

    println!("Available PCSC readers:");
    for (i, reader_info) in readers.iter().enumerate() {
        if detailed {
            println!("  [{}] {}", i, reader_info.name);
            println!(
                "      Status: {}",
                if reader_info.is_connected {
                    "Card present"
                } else {
                    "No card"
                }
            );
            if let Some(ref atr) = reader_info.atr {
                println!("      ATR: {}", format_hex_spaced(atr));
            }
        } else if reader_info.is_connected {
            println!("  [{}] {} [CARD]", i, reader_info.name);
        } else {
            println!("  [{}] {}", i, reader_info.name);
        }
    }

    Ok(())
}

/// Connect to the reader and select the card input helper application
fn open_session(reader_name: &str, mode: ShareModeArg) -> Result<PcscReader> {
    let mut reader = PcscReader::new().context("Failed to initialize PCSC")?;

    let reader_name = resolve_reader_name(&reader, reader_name)?;
    reader
        .connect(&reader_name, mode.into())
        .with_context(|| format!("Failed to connect to reader: {reader_name}"))?;

    reader
        .select_card_input_helper()
        .context("Failed to select the card input helper application")?;

    Ok(reader)
}

fn verify_standard_pin(reader: &mut PcscReader, pin: Option<String>) -> Result<()> {
    let pin = read_pin(PinSlot::Standard, pin)?;
    CardInputHelper::new(reader)
        .verify_pin(PinSlot::Standard, &pin)
        .context("Failed to verify the standard PIN")
}

fn cmd_my_number(reader_name: &str, pin: Option<String>, mode: ShareModeArg) -> Result<()> {
    let mut reader = open_session(reader_name, mode)?;
    verify_standard_pin(&mut reader, pin)?;

    let number = CardInputHelper::new(&mut reader)
        .read_identity_number()
        .context("Failed to read the identity number")?;

    println!("My Number: {number}");
    if !number.has_valid_check_digit() {
        println!("Warning: check digit does not match");
    }

    Ok(())
}

fn cmd_attributes(
    reader_name: &str,
    pin: Option<String>,
    json: bool,
    mode: ShareModeArg,
) -> Result<()> {
    let mut reader = open_session(reader_name, mode)?;
    verify_standard_pin(&mut reader, pin)?;

    let record = CardInputHelper::new(&mut reader)
        .read_attributes()
        .context("Failed to read the attributes")?;
    let summary = record.summary();

    if json {
        let output =
            serde_json::to_string_pretty(&summary).context("Failed to serialize attributes")?;
        println!("{output}");
        return Ok(());
    }

    println!("Name:    {}", summary.name);
    println!("Address: {}", summary.address);
    match summary.birth_date {
        Some(date) => println!("Birth:   {}", date.format("%Y-%m-%d")),
        None => println!("Birth:   {}", summary.birth),
    }
    println!("Sex:     {}", summary.sex_category);
    println!("Header:  {}", summary.header_hex);

    Ok(())
}

fn cmd_pin_status(reader_name: &str, slot: Option<PinSlot>, mode: ShareModeArg) -> Result<()> {
    let mut reader = open_session(reader_name, mode)?;
    let mut helper = CardInputHelper::new(&mut reader);

    let slots = match slot {
        Some(slot) => vec![slot],
        None => PinSlot::ALL.to_vec(),
    };

    for slot in slots {
        let status = helper
            .lookup_pin(slot)
            .with_context(|| format!("Failed to look up PIN {slot}"))?;
        if status.is_blocked() {
            println!("PIN {slot}: BLOCKED");
        } else {
            println!("PIN {slot}: {} attempts remaining", status.remaining);
        }
    }

    Ok(())
}

fn cmd_verify(
    reader_name: &str,
    slot: PinSlot,
    pin: Option<String>,
    mode: ShareModeArg,
) -> Result<()> {
    let mut reader = open_session(reader_name, mode)?;
    let pin = read_pin(slot, pin)?;

    CardInputHelper::new(&mut reader)
        .verify_pin(slot, &pin)
        .with_context(|| format!("Failed to verify PIN {slot}"))?;

    println!("PIN {slot}: verified");
    Ok(())
}

fn cmd_dump(
    reader_name: &str,
    file: &str,
    probe: usize,
    pin: Option<String>,
    mode: ShareModeArg,
) -> Result<()> {
    let file = parse_ef_id(file).context("Failed to parse EF identifier")?;
    if probe == 0 {
        bail!("Probe size must be at least 1");
    }

    let mut reader = open_session(reader_name, mode)?;
    if pin.is_some() {
        verify_standard_pin(&mut reader, pin)?;
    }

    let bytes = read_record(&mut reader, file, probe)
        .with_context(|| format!("Failed to read record from EF {file}"))?;
    let header = resolve_header(&bytes).context("Failed to resolve record header")?;

    println!("EF {file}: {} bytes", bytes.len());
    println!(
        "Tag: {:?} {} ({}), header {} bytes, content {} bytes",
        header.class,
        header.tag_number,
        if header.constructed {
            "constructed"
        } else {
            "primitive"
        },
        header.header_length,
        header.content_length
    );
    println!("{}", format_hex_dump(&bytes));

    Ok(())
}

fn read_pin(slot: PinSlot, provided: Option<String>) -> Result<String> {
    if let Some(pin) = provided {
        return Ok(pin);
    }

    print!("PIN {slot}: ");
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read PIN")?;

    let pin = input.trim().to_string();
    if pin.is_empty() {
        bail!("No PIN entered");
    }
    Ok(pin)
}

fn resolve_reader_name(reader: &PcscReader, name_or_index: &str) -> Result<String> {
    // Try to parse as index first
    if let Ok(index) = name_or_index.parse::<usize>() {
        let readers = reader.list_readers()?;
        if index < readers.len() {
            return Ok(readers[index].name.clone());
        }
        bail!("Reader index {} out of range ({} readers found)", index, readers.len());
    }

    Ok(name_or_index.to_string())
}
