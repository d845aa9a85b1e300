use cards_core::model::{
    Card, CardId, CardType, CardTypeId, ChoiceAnswer, ChoiceQuestion, ChoiceQuizDraft, OrderedAnswer,
    OrderedItem, OrderedQuestion, OrderedQuizDraft, QuizId, QuizKind, ResultSummary, Score,
};
use cards_core::time::fixed_now;
use storage::repository::{
    CardRepository, ChoiceQuizRepository, NewCardRecord, NewItemRecord, NewOptionRecord,
    OrderedQuizRepository, ResultRepository, StorageError,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

async fn insert_card(repo: &SqliteRepository, ty: &CardType, front: &str) -> Card {
    repo.insert_card(NewCardRecord {
        type_id: ty.id(),
        front: front.into(),
        back: "answer".into(),
    })
    .await
    .unwrap()
}

async fn insert_items(repo: &SqliteRepository, card: &Card, texts: &[&str]) -> Vec<OrderedItem> {
    let mut items = Vec::new();
    for (position, text) in (0_u32..).zip(texts) {
        items.push(
            repo.insert_ordered_item(NewItemRecord {
                card_id: card.id(),
                text: (*text).into(),
                position,
            })
            .await
            .unwrap(),
        );
    }
    items
}

#[tokio::test]
async fn sqlite_card_repository_roundtrip() {
    let repo = connect("memdb_cards").await;

    let ty = repo.insert_card_type("geography").await.unwrap();
    assert!(matches!(
        repo.insert_card_type("geography").await.unwrap_err(),
        StorageError::Conflict
    ));
    assert_eq!(repo.find_card_type("geography").await.unwrap(), Some(ty.clone()));
    assert_eq!(repo.find_card_type("history").await.unwrap(), None);

    let card = insert_card(&repo, &ty, "Capital of France?").await;
    let paris = repo
        .insert_option(NewOptionRecord {
            card_id: card.id(),
            text: "Paris".into(),
            is_correct: true,
        })
        .await
        .unwrap();
    repo.insert_option(NewOptionRecord {
        card_id: card.id(),
        text: "Lyon".into(),
        is_correct: false,
    })
    .await
    .unwrap();

    let options = repo.options_for_card(card.id()).await.unwrap();
    assert_eq!(options.len(), 2);
    assert_eq!(options[0], paris);
    assert!(options[0].is_correct());

    let listed = repo.list_cards_by_type("geography").await.unwrap();
    assert_eq!(listed, vec![card.clone()]);
    assert!(repo.list_cards_by_type("history").await.unwrap().is_empty());

    let orphan = repo
        .insert_card(NewCardRecord {
            type_id: CardTypeId::new(999),
            front: "Q".into(),
            back: "A".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(orphan, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_items_sort_by_position_and_known_flags_persist() {
    let repo = connect("memdb_items").await;
    let ty = repo.insert_card_type("writing").await.unwrap();
    let card = insert_card(&repo, &ty, "Order the parts of an essay").await;

    for (text, position) in [("end", 2), ("intro", 0), ("body", 1)] {
        repo.insert_ordered_item(NewItemRecord {
            card_id: card.id(),
            text: text.into(),
            position,
        })
        .await
        .unwrap();
    }
    let duplicate = repo
        .insert_ordered_item(NewItemRecord {
            card_id: card.id(),
            text: "again".into(),
            position: 0,
        })
        .await
        .unwrap_err();
    assert!(matches!(duplicate, StorageError::Conflict));

    let texts: Vec<String> = repo
        .ordered_items_for_card(card.id())
        .await
        .unwrap()
        .iter()
        .map(|i| i.text().to_owned())
        .collect();
    assert_eq!(texts, ["intro", "body", "end"]);

    repo.set_known(card.id(), true).await.unwrap();
    assert!(repo.get_card(card.id()).await.unwrap().unwrap().is_known());
    assert_eq!(repo.clear_known(ty.id()).await.unwrap(), 1);
    assert!(!repo.get_card(card.id()).await.unwrap().unwrap().is_known());
    assert!(matches!(
        repo.set_known(CardId::new(404), true).await.unwrap_err(),
        StorageError::NotFound
    ));
}

#[tokio::test]
async fn sqlite_choice_quiz_keeps_layout_and_rejects_resubmission() {
    let repo = connect("memdb_choice").await;
    let ty = repo.insert_card_type("geography").await.unwrap();

    let mut questions = Vec::new();
    let mut answers = Vec::new();
    for front in ["Capital of France?", "Capital of Japan?"] {
        let card = insert_card(&repo, &ty, front).await;
        let mut ids = Vec::new();
        for (text, is_correct) in [("right", true), ("wrong", false), ("other", false)] {
            let option = repo
                .insert_option(NewOptionRecord {
                    card_id: card.id(),
                    text: text.into(),
                    is_correct,
                })
                .await
                .unwrap();
            ids.push(option.id());
        }
        answers.push((card.id(), ids[0]));
        ids.reverse();
        questions.push(ChoiceQuestion {
            card_id: card.id(),
            option_order: ids,
        });
    }
    questions.reverse();

    let draft = ChoiceQuizDraft::new(ty.id(), fixed_now(), questions.clone()).unwrap();
    let quiz = repo.create_choice_quiz(&draft).await.unwrap();
    assert_eq!(quiz.questions, questions);

    let first = repo.get_choice_quiz(quiz.id).await.unwrap().expect("quiz");
    let second = repo.get_choice_quiz(quiz.id).await.unwrap().expect("quiz");
    assert_eq!(first, quiz);
    assert_eq!(first, second);

    let rows: Vec<ChoiceAnswer> = answers
        .iter()
        .map(|(card_id, option_id)| ChoiceAnswer {
            quiz_id: quiz.id,
            card_id: *card_id,
            selected: *option_id,
            correct: *option_id,
        })
        .collect();
    let result = ResultSummary::new(
        QuizKind::MultipleChoice,
        quiz.id,
        Score::from_counts(2, 0),
        fixed_now(),
    );
    repo.record_choice_submission(&rows, &result).await.unwrap();
    assert_eq!(repo.choice_answers(quiz.id).await.unwrap(), rows);
    assert_eq!(
        repo.get_result(QuizKind::MultipleChoice, quiz.id)
            .await
            .unwrap(),
        Some(result.clone())
    );

    let again = repo.record_choice_submission(&rows, &result).await.unwrap_err();
    assert!(matches!(again, StorageError::Conflict));
    assert_eq!(repo.choice_answers(quiz.id).await.unwrap().len(), 2);

    let missing = ResultSummary::new(
        QuizKind::MultipleChoice,
        QuizId::new(9_999),
        Score::from_counts(0, 0),
        fixed_now(),
    );
    assert!(matches!(
        repo.record_choice_submission(&[], &missing).await.unwrap_err(),
        StorageError::NotFound
    ));
    assert_eq!(repo.get_choice_quiz(QuizId::new(9_999)).await.unwrap(), None);
}

#[tokio::test]
async fn sqlite_empty_choice_quiz_roundtrips() {
    let repo = connect("memdb_empty").await;
    let ty = repo.insert_card_type("empty").await.unwrap();

    let draft = ChoiceQuizDraft::new(ty.id(), fixed_now(), Vec::new()).unwrap();
    let quiz = repo.create_choice_quiz(&draft).await.unwrap();
    let fetched = repo.get_choice_quiz(quiz.id).await.unwrap().expect("quiz");
    assert!(fetched.questions.is_empty());

    let result = ResultSummary::new(
        QuizKind::MultipleChoice,
        quiz.id,
        Score::from_counts(0, 0),
        fixed_now(),
    );
    repo.record_choice_submission(&[], &result).await.unwrap();
    let stored = repo
        .get_result(QuizKind::MultipleChoice, quiz.id)
        .await
        .unwrap()
        .expect("result");
    assert!(stored.score().percentage.abs() < f64::EPSILON);
}

#[tokio::test]
async fn sqlite_ordered_quiz_roundtrip() {
    let repo = connect("memdb_ordered").await;
    let ty = repo.insert_card_type("writing").await.unwrap();
    let card = insert_card(&repo, &ty, "Order the parts of an essay").await;
    let items = insert_items(&repo, &card, &["intro", "body", "end"]).await;

    let shuffled = vec![items[1].id(), items[2].id(), items[0].id()];
    let draft = OrderedQuizDraft::new(
        ty.id(),
        fixed_now(),
        vec![OrderedQuestion {
            card_id: card.id(),
            item_order: shuffled.clone(),
        }],
    )
    .unwrap();
    let quiz = repo.create_ordered_quiz(&draft).await.unwrap();

    let fetched = repo.get_ordered_quiz(quiz.id).await.unwrap().expect("quiz");
    assert_eq!(fetched, quiz);
    assert_eq!(fetched.questions[0].item_order, shuffled);

    // Submitted out of card order on purpose; reads come back sorted by position.
    let rows = vec![
        OrderedAnswer {
            quiz_id: quiz.id,
            card_id: card.id(),
            item_id: items[0].id(),
            position: 1,
        },
        OrderedAnswer {
            quiz_id: quiz.id,
            card_id: card.id(),
            item_id: items[1].id(),
            position: 0,
        },
        OrderedAnswer {
            quiz_id: quiz.id,
            card_id: card.id(),
            item_id: items[2].id(),
            position: 2,
        },
    ];
    let result = ResultSummary::new(
        QuizKind::Ordered,
        quiz.id,
        Score::from_counts(0, 1),
        fixed_now(),
    );
    repo.record_ordered_submission(&rows, &result).await.unwrap();

    let stored: Vec<u32> = repo
        .ordered_answers(quiz.id)
        .await
        .unwrap()
        .iter()
        .map(|a| a.position)
        .collect();
    assert_eq!(stored, [0, 1, 2]);
    assert_eq!(
        repo.get_result(QuizKind::Ordered, quiz.id).await.unwrap(),
        Some(result.clone())
    );
    assert_eq!(
        repo.get_result(QuizKind::MultipleChoice, quiz.id)
            .await
            .unwrap(),
        None
    );
    assert!(matches!(
        repo.record_ordered_submission(&rows, &result)
            .await
            .unwrap_err(),
        StorageError::Conflict
    ));
}
