//! End-to-end tests for generation against a scripted runtime

#[cfg(test)]
mod tests {
    use crate::{
        CancelToken, GenerationEvent, GenerationRequest, Generator, GeneratorConfig, GeneratorError,
        SessionManager, MODEL_UNAVAILABLE,
    };
    use serde_json::json;
    use smartstudy_domain::{DocumentMeta, Flashcard, StudySession};
    use smartstudy_llm::{Availability, MockRuntime};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn meta() -> DocumentMeta {
        DocumentMeta::new("abc123", "Photosynthesis.pdf", 2048, 1_700_000_000_000, "application/pdf")
    }

    fn request() -> GenerationRequest {
        let text = "Photosynthesis converts light energy into chemical energy. \
                    Chlorophyll absorbs light. Plants release oxygen.";
        GenerationRequest::new(text, vec![text.to_string()], 3, meta())
    }

    fn generator(runtime: &MockRuntime) -> Generator {
        Generator::new(SessionManager::with_runtime(Arc::new(runtime.clone())))
    }

    fn quiz_item(n: usize) -> serde_json::Value {
        json!({
            "question": format!("Question {}?", n),
            "options": ["A", "B", "C", "D"],
            "answer": "A",
            "explanation": format!("Because {}", n)
        })
    }

    #[tokio::test]
    async fn test_quiz_truncates_to_desired_count_in_order() {
        let items: Vec<_> = (1..=5).map(quiz_item).collect();
        let runtime = MockRuntime::new(json!(items).to_string());

        let quiz = generator(&runtime)
            .generate_quiz(&request().with_desired_count(Some(3)), None)
            .await
            .unwrap();

        let questions: Vec<_> = quiz.iter().map(|item| item.question.as_str()).collect();
        assert_eq!(questions, vec!["Question 1?", "Question 2?", "Question 3?"]);
        assert!(runtime.prompts()[0].prompt.contains("Create exactly 3 multiple-choice questions"));
    }

    #[tokio::test]
    async fn test_quiz_drops_malformed_items() {
        let runtime = MockRuntime::new(
            json!({
                "quiz": [
                    quiz_item(1),
                    {"question": "Too few?", "options": ["A", "B"], "answer": "A"},
                    quiz_item(3)
                ]
            })
            .to_string(),
        );

        let quiz = generator(&runtime).generate_quiz(&request(), None).await.unwrap();
        assert_eq!(quiz.len(), 2);
        assert_eq!(quiz[1].question, "Question 3?");
    }

    #[tokio::test]
    async fn test_flashcards_relaxed_retry_parses_labeled_text() {
        let runtime = MockRuntime::default();
        runtime.push_response("[]");
        runtime.push_response(
            "Question: What does chlorophyll do?\nAnswer: It absorbs light.\n\n\
             Question: What do plants release?\nAnswer: Oxygen.",
        );

        let cards = generator(&runtime).generate_flashcards(&request(), None).await.unwrap();
        assert_eq!(
            cards,
            vec![
                Flashcard::new("What does chlorophyll do?", "It absorbs light."),
                Flashcard::new("What do plants release?", "Oxygen."),
            ]
        );
    }

    #[tokio::test]
    async fn test_flashcards_relaxed_result_is_clamped() {
        let runtime = MockRuntime::default();
        runtime.push_response("{}");
        runtime.push_response("Q: One\nA: 1\n\nQ: Two\nA: 2\n\nQ: Three\nA: 3");

        let cards = generator(&runtime)
            .generate_flashcards(&request().with_desired_count(Some(2)), None)
            .await
            .unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[1].question, "Two");
    }

    #[tokio::test]
    async fn test_fenced_json_is_accepted() {
        let runtime = MockRuntime::new("```json\n{\"summary\": \"Light becomes sugar.\"}\n```");
        let summary = generator(&runtime).generate_summary(&request(), None).await.unwrap();
        assert_eq!(summary, "Light becomes sugar.");
    }

    #[tokio::test]
    async fn test_summary_respects_configured_word_limit() {
        let runtime = MockRuntime::new(json!({"summary": "one two three four five"}).to_string());
        let config = GeneratorConfig {
            summary_word_limit: 3,
            ..GeneratorConfig::default()
        };

        let summary = generator(&runtime)
            .with_config(config)
            .generate_summary(&request(), None)
            .await
            .unwrap();
        assert_eq!(summary, "one two three");
    }

    #[tokio::test]
    async fn test_empty_summary_fails() {
        let runtime = MockRuntime::new("");
        let result = generator(&runtime).generate_summary(&request(), None).await;
        assert_eq!(result, Err(GeneratorError::EmptySummary));
        assert_eq!(
            result.unwrap_err().to_string(),
            "Summary generation returned no content."
        );
    }

    #[tokio::test]
    async fn test_unavailable_model_fails_every_stage() {
        let runtime = MockRuntime::default().with_availability(Availability::Unavailable);
        let generator = generator(&runtime);
        let expected = GeneratorError::Unavailable(MODEL_UNAVAILABLE.to_string());

        assert_eq!(generator.generate_summary(&request(), None).await.unwrap_err(), expected);
        assert_eq!(generator.generate_quiz(&request(), None).await.unwrap_err(), expected);
        assert_eq!(generator.generate_flashcards(&request(), None).await.unwrap_err(), expected);
        assert_eq!(runtime.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_mid_stream() {
        let runtime = MockRuntime::new(json!({"summary": "A long streamed summary of the text."}).to_string())
            .streaming(2)
            .with_fragment_delay(Duration::from_millis(20));
        let generator = Arc::new(generator(&runtime));
        let cancel = CancelToken::new();
        let request = request().with_cancel(cancel.clone());

        let task = {
            let generator = Arc::clone(&generator);
            tokio::spawn(async move { generator.generate_summary(&request, None).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("cancellation should end the call promptly")
            .unwrap();
        assert!(result.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_status_sequence_for_first_download() {
        let runtime = MockRuntime::new("[]").with_availability(Availability::Downloadable);
        let (tx, mut rx) = mpsc::unbounded_channel();

        generator(&runtime).generate_quiz(&request(), Some(&tx)).await.unwrap();
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events.first(), Some(&GenerationEvent::Status("Downloading language model…".to_string())));
        assert!(events.contains(&GenerationEvent::DownloadProgress(100)));
        assert_eq!(
            events.last(),
            Some(&GenerationEvent::Status("Quiz generation complete.".to_string()))
        );
    }

    #[tokio::test]
    async fn test_stages_share_one_session() {
        let runtime = MockRuntime::new("[]");
        runtime.push_response(json!({"summary": "Short."}).to_string());
        let generator = generator(&runtime);

        generator.generate_summary(&request(), None).await.unwrap();
        generator.generate_quiz(&request(), None).await.unwrap();
        generator.generate_flashcards(&request(), None).await.unwrap();
        assert_eq!(runtime.sessions_created(), 1);
    }

    #[tokio::test]
    async fn test_results_survive_snapshot_round_trip() {
        let runtime = MockRuntime::default();
        runtime.push_response(json!({"summary": "Plants make sugar from light."}).to_string());
        runtime.push_response(json!([quiz_item(1), quiz_item(2)]).to_string());
        runtime.push_response(
            json!([{"front": "Chlorophyll", "back": "Green pigment", "tags": ["biology"]}]).to_string(),
        );
        let generator = generator(&runtime);

        let summary = generator.generate_summary(&request(), None).await.unwrap();
        let quiz = generator.generate_quiz(&request(), None).await.unwrap();
        let cards = generator.generate_flashcards(&request(), None).await.unwrap();

        let mut session = StudySession::new();
        session.set_pdf_meta(meta());
        session.set_summary(summary.clone());
        session.set_quiz_items(quiz.clone());
        session.set_flashcards(cards.clone());

        let mut restored = StudySession::new();
        restored.hydrate(Some(&session.to_value()));
        assert_eq!(restored, session);
        assert_eq!(restored.summary, summary);
        assert_eq!(restored.quiz_items, quiz);
        assert_eq!(restored.flashcards, cards);
        assert_eq!(restored.flashcards[0].tags, vec!["biology"]);
    }
}
