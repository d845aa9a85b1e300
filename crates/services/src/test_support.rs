//! Fixtures for service tests.

use cards_core::model::{Card, CardType, ChoiceOption, OrderedItem};
use storage::repository::{NewCardRecord, NewItemRecord, NewOptionRecord, Storage};

pub(crate) async fn card_type(storage: &Storage, name: &str) -> CardType {
    storage.cards.insert_card_type(name).await.unwrap()
}

pub(crate) async fn card(storage: &Storage, ty: &CardType, front: &str) -> Card {
    storage
        .cards
        .insert_card(NewCardRecord {
            type_id: ty.id(),
            front: front.into(),
            back: format!("back of {front}"),
        })
        .await
        .unwrap()
}

/// A card whose options are `choices`; the flag marks the correct ones.
pub(crate) async fn choice_card(
    storage: &Storage,
    ty: &CardType,
    front: &str,
    choices: &[(&str, bool)],
) -> (Card, Vec<ChoiceOption>) {
    let card = card(storage, ty, front).await;
    let mut options = Vec::new();
    for (text, is_correct) in choices {
        options.push(
            storage
                .cards
                .insert_option(NewOptionRecord {
                    card_id: card.id(),
                    text: (*text).into(),
                    is_correct: *is_correct,
                })
                .await
                .unwrap(),
        );
    }
    (card, options)
}

/// A card whose canonical sequence is `texts`.
pub(crate) async fn ordered_card(
    storage: &Storage,
    ty: &CardType,
    front: &str,
    texts: &[&str],
) -> (Card, Vec<OrderedItem>) {
    let card = card(storage, ty, front).await;
    let mut items = Vec::new();
    for (position, text) in (0_u32..).zip(texts) {
        items.push(
            storage
                .cards
                .insert_ordered_item(NewItemRecord {
                    card_id: card.id(),
                    text: (*text).into(),
                    position,
                })
                .await
                .unwrap(),
        );
    }
    (card, items)
}

/// The five-card geography deck, each card with exactly one correct option.
pub(crate) async fn geography(storage: &Storage) -> Vec<(Card, Vec<ChoiceOption>)> {
    let ty = card_type(storage, "geography").await;
    let mut cards = Vec::new();
    for (front, right, wrong) in [
        ("Capital of France?", "Paris", "Lyon"),
        ("Capital of Japan?", "Tokyo", "Osaka"),
        ("Capital of Canada?", "Ottawa", "Toronto"),
        ("Capital of Australia?", "Canberra", "Sydney"),
        ("Capital of Brazil?", "Brasilia", "Rio de Janeiro"),
    ] {
        cards.push(choice_card(storage, &ty, front, &[(right, true), (wrong, false)]).await);
    }
    cards
}
