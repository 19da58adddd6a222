use quest_core::model::{Answer, QuestionItem, QuestionType, ResultTag};

/// Grades an answer locally where the item carries an answer key.
///
/// SELECT and DRAG_DROP are graded here; other types come back `Ungraded`
/// and take the provider's verdict. A missing key, or an answer of the wrong
/// shape, is `Skipped`.
#[must_use]
pub fn evaluate(item: &QuestionItem, answer: &Answer) -> ResultTag {
    match (item.question_type, answer) {
        (QuestionType::Select, Answer::Select { option_id }) => {
            match item.metadata.correct_option_id.as_deref() {
                Some(expected) if !expected.is_empty() => grade(expected == option_id.as_str()),
                _ => ResultTag::Skipped,
            }
        }
        (QuestionType::DragDrop, Answer::DragDrop { assignments }) => {
            let pairs = &item.metadata.pairs;
            if pairs.is_empty() {
                return ResultTag::Skipped;
            }
            grade(pairs.iter().all(|pair| {
                assignments
                    .get(&pair.item_id)
                    .is_some_and(|target| target == &pair.target_id)
            }))
        }
        (QuestionType::TrueFalse, Answer::TrueFalse { .. })
        | (QuestionType::FillBlank, Answer::FillBlank { .. }) => ResultTag::Ungraded,
        _ => ResultTag::Skipped,
    }
}

fn grade(correct: bool) -> ResultTag {
    if correct {
        ResultTag::Correct
    } else {
        ResultTag::Incorrect
    }
}
