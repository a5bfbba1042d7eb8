use lootcase_core::{
    rng_from_phrase, Catalog, Money, OpenOutcome, OutcomeSelector, PhaseKind, RarityTier, Session,
    SessionConfig, SessionError,
};
use std::collections::HashMap;
use std::sync::Arc;

fn session(catalog: &Catalog) -> Session {
    Session::new(SessionConfig::default(), catalog.rarity_weights.clone())
}

#[test]
fn rng_repeatable() {
    let catalog = Catalog::builtin();
    let case = catalog.case("recoil").unwrap();
    let selector = OutcomeSelector::new(&catalog.rarity_weights);
    let mut rng1 = rng_from_phrase("s");
    let mut rng2 = rng_from_phrase("s");
    for _ in 0..10 {
        assert_eq!(
            selector.draw(&mut rng1, &case.items),
            selector.draw(&mut rng2, &case.items)
        );
    }
}

#[test]
fn balance_moves_by_price_then_item() {
    let catalog = Catalog::builtin();
    let mut session = session(&catalog);
    let mut rng = rng_from_phrase("cycle");
    let case = catalog.case("recoil").unwrap();
    session.select_case(Arc::clone(&case)).unwrap();

    for _ in 0..20 {
        let before = session.balance();
        let ticket = match session.open_case(&mut rng).unwrap() {
            OpenOutcome::Started(ticket) => ticket,
            OpenOutcome::AlreadyOpening => panic!("session was not locked"),
        };
        assert_eq!(ticket.balance, before - case.price);
        let revealed = session.reveal().unwrap();
        assert_eq!(revealed.item, *ticket.reel.winner());
        assert_eq!(session.balance(), before - case.price + revealed.item.price);
        session.open_again().unwrap();
    }
}

#[test]
fn broke_session_cannot_open() {
    let catalog = Catalog::builtin();
    let mut session = Session::new(
        SessionConfig {
            starting_balance: Money::from_cents(500),
            ..SessionConfig::default()
        },
        catalog.rarity_weights.clone(),
    );
    let mut rng = rng_from_phrase("broke");
    session
        .select_case(Arc::new(lootcase_core::Case {
            id: "pricey".into(),
            name: "Pricey".into(),
            price: Money::from_cents(1_000),
            image: String::new(),
            items: catalog.case("recoil").unwrap().items.clone(),
        }))
        .unwrap();
    assert!(matches!(
        session.open_case(&mut rng),
        Err(SessionError::InsufficientFunds { .. })
    ));
    assert_eq!(session.balance(), Money::from_cents(500));
    assert_eq!(session.phase().kind(), PhaseKind::CaseSelected);
}

#[test]
fn rarity_mix_simulation_smoke() {
    let catalog = Catalog::builtin();
    let case = catalog.case("recoil").unwrap();
    let selector = OutcomeSelector::new(&catalog.rarity_weights);
    let mut rng = rng_from_phrase("mix");
    let mut hits: HashMap<RarityTier, usize> = HashMap::new();
    for _ in 0..10_000 {
        let item = selector.draw(&mut rng, &case.items).unwrap();
        *hits.entry(item.rarity).or_default() += 1;
    }
    // Mil-Spec dominates the default weights
    let mil_spec = hits.get(&RarityTier::MilSpec).copied().unwrap_or(0);
    assert!(hits.values().all(|&n| n <= mil_spec));
    assert_eq!(hits.values().sum::<usize>(), 10_000);
}
