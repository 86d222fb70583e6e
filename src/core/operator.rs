//! Operator sessions
//!
//! Cash replenishers and technicians do not go through the client state
//! machine. Each runs a flat action loop gated by one check up front:
//!
//! 1. The operator card and PIN pass the [`Authenticator`](crate::core::Authenticator).
//! 2. The account holds the role matching the session kind.
//!
//! Individual actions are not re-authenticated. An inactivity timeout ends
//! the session directly.

use crate::core::authenticator::AuthOutcome;
use crate::core::context::AtmContext;
use crate::core::timer::Prompt;
use crate::types::{format_notes, parse_notes, AtmError, CardNumber, SessionKind};
use tracing::{info, warn};

const REPLENISHER_MENU: [&str; 5] = [
    "Show inventory",
    "Replenish cassettes",
    "Collect cash",
    "Replace cassette",
    "Finish",
];

const TECHNICIAN_MENU: [&str; 5] = [
    "Show retained cards",
    "Collect retained cards",
    "Show inventory",
    "Reboot",
    "Finish",
];

/// Outcome of one operator prompt
enum Step<T> {
    Value(T),
    /// Timed out or input closed; the session is over
    End,
}

/// Run a cash-replenisher or technician session
///
/// # Errors
///
/// Only fatal errors are returned; refusals are reported on screen.
pub fn run_operator_session(ctx: &mut AtmContext, kind: SessionKind) -> Result<(), AtmError> {
    let Some(required) = kind.required_role() else {
        return Err(AtmError::internal("client sessions use the state machine"));
    };

    let Step::Value(card) = login(ctx, kind)? else {
        return Ok(());
    };
    let role = ctx
        .accounts
        .get_account(&card)
        .map(|account| account.role)
        .unwrap_or_default();
    if role != required {
        let denied = AtmError::AccessDenied {
            card: card.masked(),
            required: required.to_string(),
        };
        warn!(card = %card.masked(), %kind, "Operator access denied");
        ctx.sound.beep_error();
        ctx.prompter.message(&format!("Error: {}", denied));
        return Ok(());
    }

    if let Err(e) = ctx.session.start(kind, card.as_str()) {
        ctx.prompter.message(&format!("Error: {}", e));
        return Ok(());
    }
    ctx.sound.beep_success();
    ctx.prompter.message(&format!("Welcome, {}.", kind));

    let result = match kind {
        SessionKind::CashReplenisher => replenisher_loop(ctx),
        _ => technician_loop(ctx),
    };
    ctx.session.end();
    result
}

/// Ask for the operator card and PIN
fn login(ctx: &mut AtmContext, kind: SessionKind) -> Result<Step<CardNumber>, AtmError> {
    let Step::Value(input) = ask(ctx, &format!("{} card number: ", kind)) else {
        return Ok(Step::End);
    };
    let card = match CardNumber::parse(&input) {
        Ok(card) => card,
        Err(e) => {
            refuse(ctx, &e);
            return Ok(Step::End);
        }
    };
    let Step::Value(pin) = ask(ctx, "PIN: ") else {
        return Ok(Step::End);
    };

    let message = match ctx.authenticator.authenticate(&card, &pin)? {
        AuthOutcome::Granted => return Ok(Step::Value(card)),
        AuthOutcome::Rejected { attempts_left } => {
            format!("Wrong PIN. Attempts left: {}", attempts_left)
        }
        AuthOutcome::Locked | AuthOutcome::CardBlocked => "Card is blocked.".to_string(),
        AuthOutcome::UnknownCard => "Card not recognised.".to_string(),
        AuthOutcome::InvalidFormat => format!(
            "PIN must be {} digits.",
            ctx.authenticator.pin_length()
        ),
    };
    warn!(card = %card.masked(), %kind, "Operator login failed");
    ctx.sound.beep_error();
    ctx.prompter.message(&message);
    Ok(Step::End)
}

fn replenisher_loop(ctx: &mut AtmContext) -> Result<(), AtmError> {
    loop {
        let Step::Value(choice) = choose(ctx, "Cash replenisher menu", &REPLENISHER_MENU) else {
            return Ok(());
        };
        let result = match choice.as_str() {
            "1" => {
                show_inventory(ctx);
                Ok(())
            }
            "2" => match ask_notes(ctx, "Notes to load (denom:count ...): ") {
                Step::Value(Ok(notes)) => ctx.inventory.replenish(&notes),
                Step::Value(Err(e)) => Err(e),
                Step::End => return Ok(()),
            },
            "3" => match ask_notes(ctx, "Notes to collect (denom:count ...): ") {
                Step::Value(Ok(notes)) => ctx.inventory.collect(&notes),
                Step::Value(Err(e)) => Err(e),
                Step::End => return Ok(()),
            },
            "4" => match ask(ctx, "Cassette to replace (denom:count): ") {
                Step::Value(input) => replace_cassette(ctx, &input),
                Step::End => return Ok(()),
            },
            "5" => return Ok(()),
            _ => {
                ctx.prompter.message("Invalid option.");
                Ok(())
            }
        };
        settle(ctx, result)?;
    }
}

fn technician_loop(ctx: &mut AtmContext) -> Result<(), AtmError> {
    loop {
        let Step::Value(choice) = choose(ctx, "Technician menu", &TECHNICIAN_MENU) else {
            return Ok(());
        };
        let result = match choice.as_str() {
            "1" => {
                show_retained(ctx);
                Ok(())
            }
            "2" => collect_retained(ctx),
            "3" => {
                show_inventory(ctx);
                Ok(())
            }
            "4" => reboot(ctx),
            "5" => return Ok(()),
            _ => {
                ctx.prompter.message("Invalid option.");
                Ok(())
            }
        };
        settle(ctx, result)?;
    }
}

fn show_inventory(ctx: &mut AtmContext) {
    let mut text = String::from("Cash inventory:");
    for denom in ctx.inventory.denominations() {
        text.push_str(&format!("\n  {:>5}: {}", denom, ctx.inventory.count(*denom)));
    }
    text.push_str(&format!(
        "\nTotal: {} {}",
        ctx.inventory.total(),
        ctx.config.currency
    ));
    ctx.prompter.message(&text);
}

fn replace_cassette(ctx: &mut AtmContext, input: &str) -> Result<(), AtmError> {
    let notes = parse_notes(input)?;
    let mut entries = notes.into_iter();
    let (Some((denomination, count)), None) = (entries.next(), entries.next()) else {
        return Err(AtmError::invalid_input("expected exactly one denom:count pair"));
    };
    let previous = ctx.inventory.replace_cassette(denomination, count)?;
    ctx.prompter.message(&format!(
        "Cassette {} replaced: {} -> {} notes.",
        denomination, previous, count
    ));
    Ok(())
}

fn show_retained(ctx: &mut AtmContext) {
    if ctx.retainer.is_empty() {
        ctx.prompter.message("No retained cards.");
        return;
    }
    let cards: Vec<String> = ctx
        .retainer
        .cards()
        .iter()
        .map(|card| card.number.masked())
        .collect();
    ctx.prompter
        .message(&format!("Retained cards: {}", cards.join(", ")));
}

/// Empty the retention bin and clear the retained flags
///
/// The cards stay blocked. If the flags cannot be saved the cards go back
/// into the bin.
fn collect_retained(ctx: &mut AtmContext) -> Result<(), AtmError> {
    let cards = ctx.retainer.collect_all();
    if cards.is_empty() {
        ctx.prompter.message("No retained cards.");
        return Ok(());
    }
    let numbers: Vec<CardNumber> = cards.iter().map(|card| card.number.clone()).collect();
    if let Err(e) = ctx.accounts.collect_retained(&numbers) {
        for card in cards {
            ctx.retainer.retain(card);
        }
        return Err(e);
    }

    info!(count = numbers.len(), "Retained cards collected");
    let masked: Vec<String> = numbers.iter().map(CardNumber::masked).collect();
    ctx.prompter.message(&format!(
        "Collected {} card(s): {}",
        numbers.len(),
        masked.join(", ")
    ));
    Ok(())
}

/// Power-cycle the machine and reload the cassette counts
fn reboot(ctx: &mut AtmContext) -> Result<(), AtmError> {
    ctx.prompter.message("Rebooting...");
    ctx.power.power_off();
    ctx.power.power_on();
    ctx.inventory.reload()?;
    info!(cycle = ctx.power.cycles(), "Reboot complete");
    ctx.prompter.message("Reboot complete.");
    Ok(())
}

/// Report the outcome of an action; fatal errors are returned
fn settle(ctx: &mut AtmContext, result: Result<(), AtmError>) -> Result<(), AtmError> {
    match result {
        Ok(()) => {
            ctx.sound.beep_success();
            Ok(())
        }
        Err(e) if !e.is_fatal() => {
            refuse(ctx, &e);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn refuse(ctx: &mut AtmContext, error: &AtmError) {
    warn!(error = %error, "Operator action refused");
    ctx.sound.beep_error();
    ctx.prompter.message(&format!("Error: {}", error));
}

fn ask(ctx: &mut AtmContext, prompt: &str) -> Step<String> {
    into_step(ctx, |ctx| ctx.prompter.ask(prompt))
}

fn choose(ctx: &mut AtmContext, title: &str, options: &[&str]) -> Step<String> {
    into_step(ctx, |ctx| ctx.prompter.choose(title, options))
}

fn ask_notes(
    ctx: &mut AtmContext,
    prompt: &str,
) -> Step<Result<crate::types::Notes, AtmError>> {
    match ask(ctx, prompt) {
        Step::Value(input) => {
            let notes = parse_notes(&input).map(|notes| {
                info!(notes = %format_notes(&notes), "Operator entered notes");
                notes
            });
            Step::Value(notes)
        }
        Step::End => Step::End,
    }
}

fn into_step<F>(ctx: &mut AtmContext, read: F) -> Step<String>
where
    F: FnOnce(&mut AtmContext) -> Prompt,
{
    match read(ctx) {
        Prompt::Line(line) => Step::Value(line),
        Prompt::TimedOut => {
            ctx.prompter.message("Session timed out due to inactivity.");
            ctx.session.end();
            Step::End
        }
        Prompt::Closed => Step::End,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::testing::{lines, machine};
    use crate::io::ScriptStep;
    use crate::types::Card;

    const REPLENISHER: &str = "1000000000000001";
    const TECHNICIAN: &str = "1000000000000002";

    fn card(number: &str) -> CardNumber {
        CardNumber::parse(number).unwrap()
    }

    #[test]
    fn test_replenisher_actions() {
        let mut m = machine(
            lines(&[
                REPLENISHER, "1111", "2", "100:10 50:4", "3", "50:1", "4", "200:30", "1", "5",
            ]),
            &[(100, 1)],
        );
        run_operator_session(&mut m.ctx, SessionKind::CashReplenisher).unwrap();

        assert_eq!(m.ctx.inventory.count(100), 11);
        assert_eq!(m.ctx.inventory.count(50), 3);
        assert_eq!(m.ctx.inventory.count(200), 30);
        assert!(!m.ctx.session.is_active());
        assert!(m.transcript.contains("Cassette 200 replaced: 0 -> 30 notes."));
        assert!(m.transcript.contains("Total: "));
    }

    #[test]
    fn test_refused_action_keeps_session() {
        let mut m = machine(
            lines(&[REPLENISHER, "1111", "3", "100:5", "2", "7:1", "5"]),
            &[(100, 1)],
        );
        run_operator_session(&mut m.ctx, SessionKind::CashReplenisher).unwrap();

        assert_eq!(m.ctx.inventory.count(100), 1);
        assert!(m.transcript.contains("Not enough 100 notes"));
        assert!(m.transcript.contains("Unsupported denomination: 7"));
    }

    #[test]
    fn test_wrong_role_is_denied() {
        let mut m = machine(lines(&[TECHNICIAN, "2222", "1"]), &[]);
        run_operator_session(&mut m.ctx, SessionKind::CashReplenisher).unwrap();

        assert!(m.transcript.contains("Access denied"));
        assert!(!m.ctx.session.is_active());
        assert!(!m.transcript.contains("Cash replenisher menu"));
    }

    #[test]
    fn test_client_card_is_denied() {
        let mut m = machine(lines(&["1234567890123456", "0000"]), &[]);
        run_operator_session(&mut m.ctx, SessionKind::Technician).unwrap();
        assert!(m.transcript.contains("Access denied"));
    }

    #[test]
    fn test_wrong_pin_counts_toward_lockout() {
        let mut m = machine(lines(&[TECHNICIAN, "9999"]), &[]);
        run_operator_session(&mut m.ctx, SessionKind::Technician).unwrap();

        assert!(m.transcript.contains("Wrong PIN. Attempts left: 2"));
        assert_eq!(m.ctx.authenticator.attempts_left(&card(TECHNICIAN)), Some(2));
    }

    #[test]
    fn test_technician_collects_retained_cards() {
        let mut m = machine(lines(&[TECHNICIAN, "2222", "1", "2", "1", "5"]), &[]);
        let client = card("1234567890123456");
        m.ctx.accounts.block_card(&client).unwrap();
        m.ctx.accounts.set_retained(&client, true).unwrap();
        m.ctx.retainer.retain(Card::new(client.clone(), None, None));

        run_operator_session(&mut m.ctx, SessionKind::Technician).unwrap();

        assert!(m.transcript.contains("Retained cards: ****3456"));
        assert!(m.transcript.contains("Collected 1 card(s): ****3456"));
        assert!(m.transcript.contains("No retained cards."));
        assert!(m.ctx.retainer.is_empty());
        assert!(m.ctx.accounts.retained_card_numbers().is_empty());
        assert!(m.ctx.accounts.is_blocked(&client));
    }

    #[test]
    fn test_failed_collection_keeps_cards_in_bin() {
        let mut m = machine(lines(&[TECHNICIAN, "2222", "2"]), &[]);
        m.ctx
            .retainer
            .retain(Card::new(card("1234567890123456"), None, None));
        m.accounts_repo.fail_saves(true);

        let result = run_operator_session(&mut m.ctx, SessionKind::Technician);
        assert!(matches!(result, Err(AtmError::Storage { .. })));
        assert_eq!(m.ctx.retainer.len(), 1);
        assert!(!m.ctx.session.is_active());
    }

    #[test]
    fn test_reboot_reloads_inventory() {
        let mut m = machine(lines(&[TECHNICIAN, "2222", "4", "5"]), &[(100, 5)]);
        let mut saved = m.inventory_repo.saved_inventory().unwrap();
        saved.insert(100, 9);
        crate::core::traits::InventoryRepository::save_inventory(m.inventory_repo.as_ref(), &saved)
            .unwrap();

        run_operator_session(&mut m.ctx, SessionKind::Technician).unwrap();

        assert_eq!(m.ctx.power.cycles(), 1);
        assert!(m.ctx.power.is_on());
        assert_eq!(m.ctx.inventory.count(100), 9);
        assert!(m.transcript.contains("Reboot complete."));
    }

    #[test]
    fn test_timeout_ends_operator_session() {
        let mut steps = lines(&[REPLENISHER, "1111"]);
        steps.push(ScriptStep::silence_ms(120));
        steps.push(ScriptStep::line("1"));
        let mut m = machine(steps, &[]);

        run_operator_session(&mut m.ctx, SessionKind::CashReplenisher).unwrap();
        assert!(m.transcript.contains("Session timed out"));
        assert!(!m.ctx.session.is_active());
        assert!(!m.transcript.contains("Cash inventory:"));
    }
}
