use lootcase_core::{rng_from_phrase, Catalog, OpenOutcome, Session, SessionConfig};
use std::sync::Arc;

fn main() {
    // One open without the reveal delay
    let catalog = Catalog::builtin();
    let mut session = Session::new(SessionConfig::default(), catalog.rarity_weights.clone());
    let mut rng = rng_from_phrase("example-seed");
    let Some(case) = catalog.case("recoil") else {
        eprintln!("builtin catalog has no recoil case");
        return;
    };
    if let Err(e) = session.select_case(Arc::clone(&case)) {
        eprintln!("{e}");
        return;
    }
    match session.open_case(&mut rng) {
        Ok(OpenOutcome::Started(ticket)) => {
            println!("paid {} balance={}", ticket.price, ticket.balance);
        }
        Ok(OpenOutcome::AlreadyOpening) => return,
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    }
    match session.reveal() {
        Ok(revealed) => println!(
            "won {} ({}) worth {} balance={}",
            revealed.item.name, revealed.item.rarity, revealed.item.price, revealed.balance
        ),
        Err(e) => eprintln!("{e}"),
    }
}
