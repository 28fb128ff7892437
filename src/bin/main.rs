// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use clap::{Parser, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use vending_machine_rs::{
    CsvStore, DENOMINATIONS, DenominationCount, Item, ItemId, LedgerStore, MachineConfig,
    VendingError, VendingMachine,
};

#[derive(Parser, Debug)]
#[command(name = "vending-machine-rs")]
#[command(about = "An interactive vending machine with a change box and a collection box", long_about = None)]
struct Args {
    /// Session to start: `user` buys items, `admin` restocks and collects cash
    #[arg(value_enum, default_value_t = Mode::User)]
    mode: Mode,

    /// Directory holding the stock, change box and collection box ledgers
    #[arg(long, env = "VENDING_DATA_DIR", default_value = "vending-data")]
    data_dir: PathBuf,

    /// Collection box cap per denomination before the machine stops serving
    #[arg(long, env = "VENDING_MAX_COLLECTION", default_value_t = MachineConfig::DEFAULT_MAX_COLLECTION)]
    max_collection: u32,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    User,
    Admin,
}

#[derive(Error, Debug)]
enum CliError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Vending(#[from] VendingError),
}

fn main() {
    let args = Args::parse();
    init_tracing();

    let store = match CsvStore::open(&args.data_dir) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error opening ledgers in '{}': {}", args.data_dir.display(), e);
            process::exit(1);
        }
    };
    let config = MachineConfig::with_max_collection(args.max_collection);
    let machine = match VendingMachine::open(store, config) {
        Ok(machine) => machine,
        Err(e) => {
            eprintln!("Error loading vending machine: {}", e);
            process::exit(1);
        }
    };

    let stdin = io::stdin();
    let mut prompt = Prompt::new(stdin.lock(), io::stdout());
    let result = match args.mode {
        Mode::User => user_session(&machine, &mut prompt),
        Mode::Admin => admin_session(&machine, &mut prompt),
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Logs go to stderr so the tables on stdout stay readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Line-oriented input collaborator.
///
/// Every `ask_*` returns `Ok(None)` once input is exhausted, which callers
/// treat as the customer or operator walking away.
struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn say(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, "{message}")
    }

    fn ask_line(&mut self, question: &str) -> io::Result<Option<String>> {
        write!(self.output, "{question}\n> ")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Re-asks until the answer parses as an integer.
    fn ask_number(&mut self, question: &str) -> io::Result<Option<i64>> {
        loop {
            let Some(answer) = self.ask_line(question)? else {
                return Ok(None);
            };
            match answer.parse::<i64>() {
                Ok(number) => return Ok(Some(number)),
                Err(_) => self.say(&format!("- - '{answer}' is not a number."))?,
            }
        }
    }

    /// Asks for one non-negative count per denomination, largest first.
    fn ask_counts(&mut self, label: impl Fn(i64) -> String) -> io::Result<Option<DenominationCount>> {
        let mut counts = [0; DENOMINATIONS.len()];
        for (slot, denomination) in DENOMINATIONS.iter().enumerate() {
            loop {
                let Some(count) = self.ask_number(&label(*denomination))? else {
                    return Ok(None);
                };
                if count >= 0 {
                    counts[slot] = count;
                    break;
                }
                self.say("- - Please enter zero or more.")?;
            }
        }
        Ok(Some(DenominationCount::new(counts)))
    }

    /// Reads `name price amount` on one line.
    fn ask_restock(&mut self) -> io::Result<Option<(String, i64, i64)>> {
        loop {
            let Some(line) = self.ask_line("\n- - Enter the item's data (name price amount)")? else {
                return Ok(None);
            };
            let fields: Vec<&str> = line.split_whitespace().collect();
            if let [name, price, amount] = fields.as_slice() {
                if let (Ok(price), Ok(amount)) = (price.parse::<i64>(), amount.parse::<i64>()) {
                    return Ok(Some((name.to_string(), price, amount)));
                }
            }
            self.say("- - Expected: name price amount (e.g. cola 15 10)")?;
        }
    }
}

const RULE: &str = "--------------------------------------------------------------------------------------------------------------------------";

fn print_items<W: Write>(out: &mut W, items: &[Item]) -> io::Result<()> {
    writeln!(out, "{RULE}")?;
    writeln!(out, "{:<10}{:<30}{:<20}{}", "ID", "Name", "Price", "Amount")?;
    writeln!(out, "{RULE}")?;
    for item in items {
        writeln!(
            out,
            "{:<10}{:<30}{:<20}{}",
            item.id.0,
            item.name,
            item.price.to_string(),
            item.amount
        )?;
    }
    Ok(())
}

fn print_cash<W: Write>(out: &mut W, counts: &DenominationCount) -> io::Result<()> {
    writeln!(out, "{RULE}")?;
    for denomination in DENOMINATIONS {
        write!(out, "{:<20}", format!("{denomination}-THB"))?;
    }
    writeln!(out)?;
    writeln!(out, "{RULE}")?;
    for (_, count) in counts.iter() {
        write!(out, "{count:<20}")?;
    }
    writeln!(out)?;
    Ok(())
}

fn print_breakdown<W: Write>(out: &mut W, counts: &DenominationCount) -> io::Result<()> {
    for (denomination, count) in counts.iter() {
        writeln!(out, "{denomination} baht: {count}")?;
    }
    Ok(())
}

fn tender_label(denomination: i64) -> String {
    if denomination > 15 {
        format!("Enter {denomination} bills:")
    } else {
        format!("Enter {denomination} coins:")
    }
}

const NOT_READY: &str =
    "\n- - The vending machine is not ready to use. We're terribly sorry for the inconvenience.";

/// Customer loop: one purchase per iteration until the customer leaves or
/// the machine stops being ready.
fn user_session<S, R, W>(machine: &VendingMachine<S>, prompt: &mut Prompt<R, W>) -> Result<(), CliError>
where
    S: LedgerStore,
    R: BufRead,
    W: Write,
{
    loop {
        let mut purchase = match machine.begin_purchase() {
            Ok(purchase) => purchase,
            Err(VendingError::NotReady) => {
                prompt.say(NOT_READY)?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        prompt.say("\n- - Welcome to this vending machine.")?;
        print_items(&mut prompt.output, &machine.items())?;

        let item = loop {
            let Some(answer) =
                prompt.ask_number("\n- - What would you like to buy? (enter an ID, 0 to exit)")?
            else {
                return Ok(());
            };
            if answer == 0 {
                return Ok(());
            }
            let id = ItemId(u32::try_from(answer).unwrap_or(u32::MAX));
            match purchase.select(id) {
                Ok(item) => break item,
                Err(VendingError::ItemNotFound(_)) => {
                    prompt.say(&format!("\n- - There is no item with ID {answer}."))?;
                }
                Err(VendingError::OutOfStock(_)) => {
                    prompt.say("\n- - The selected item is out of stock.")?;
                    purchase = match machine.begin_purchase() {
                        Ok(purchase) => purchase,
                        Err(VendingError::NotReady) => {
                            prompt.say(NOT_READY)?;
                            return Ok(());
                        }
                        Err(e) => return Err(e.into()),
                    };
                }
                Err(e) => return Err(e.into()),
            }
        };

        loop {
            prompt.say(&format!("\n- - {} costs {}.", item.name, item.price))?;
            let Some(notes) = prompt.ask_counts(tender_label)? else {
                let refund = purchase.cancel();
                prompt.say(&format!("\n- - Purchase cancelled, returning {} baht.", refund.value()))?;
                return Ok(());
            };
            let progress = match purchase.tender(&notes) {
                Ok(progress) => progress,
                Err(e @ VendingError::InvalidArgument(_)) => {
                    prompt.say(&format!("\n- - {e}. Please insert it again."))?;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if progress.is_sufficient() {
                break;
            }
            prompt.say(&format!(
                "\n- - The payment is not enough, {} baht to go.",
                progress.remaining()
            ))?;
        }

        match purchase.checkout() {
            Ok(receipt) => {
                prompt.say("\n- - The vending machine returns some changes.")?;
                print_breakdown(&mut prompt.output, &receipt.change)?;
            }
            Err(VendingError::Infeasible { .. }) => {
                prompt.say(
                    "\n- - The change box doesn't have enough money. Please take back your payment and come again later.",
                )?;
                continue;
            }
            Err(e) => return Err(e.into()),
        }

        let again = loop {
            match prompt
                .ask_line(
                    "\n- - You have purchased an item. Would you like to make another purchase?\n1) Yes\n2) No",
                )?
                .as_deref()
            {
                Some("1") => break true,
                Some("2") | None => break false,
                Some(_) => prompt.say("- - Please enter 1 or 2.")?,
            }
        };
        if !again {
            prompt.say("\n- - Thank you for using our service!")?;
            return Ok(());
        }
    }
}

/// Operator menu. Rejected operations are reported and the menu shown again;
/// store failures end the session.
fn admin_session<S, R, W>(machine: &VendingMachine<S>, prompt: &mut Prompt<R, W>) -> Result<(), CliError>
where
    S: LedgerStore,
    R: BufRead,
    W: Write,
{
    loop {
        let Some(choice) = prompt.ask_line(
            "\n- - Hello, admin! What will you do?\n1) View items\n2) Set stock / Restock\n3) Check change box / collection box\n4) Collect money\n5) Refill change box\n0) quit",
        )?
        else {
            return Ok(());
        };

        let outcome: Result<Option<String>, VendingError> = match choice.as_str() {
            "1" => {
                prompt.say("\n- - Vending Machine's all items")?;
                print_items(&mut prompt.output, &machine.items())?;
                Ok(None)
            }
            "2" => {
                let Some((name, price, amount)) = prompt.ask_restock()? else {
                    return Ok(());
                };
                machine
                    .restock(&name, price, amount)
                    .map(|_| Some("- - Restock item successfully!".to_string()))
            }
            "3" => {
                prompt.say("\n- - Change box information: ")?;
                print_cash(&mut prompt.output, &machine.change_box())?;
                prompt.say("\n- - Collection box information: ")?;
                print_cash(&mut prompt.output, &machine.collection_box())?;
                Ok(None)
            }
            "4" => machine
                .empty_collection_box()
                .map(|total| Some(format!("\n- - You've collected {total} Baht!"))),
            "5" => {
                let label = |denomination: i64| format!("\n- - Enter an amount of {denomination} Baht");
                let Some(counts) = prompt.ask_counts(label)? else {
                    return Ok(());
                };
                machine
                    .refill_change_box(&counts)
                    .map(|counts| Some(format!("- - Change box now holds {counts}")))
            }
            _ => {
                prompt.say("- - Have a good day!")?;
                return Ok(());
            }
        };

        match outcome {
            Ok(Some(message)) => prompt.say(&message)?,
            Ok(None) => {}
            Err(e @ VendingError::Store(_)) => return Err(e.into()),
            Err(e) => prompt.say(&format!("- - {e}"))?,
        }
    }
}
