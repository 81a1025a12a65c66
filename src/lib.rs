//! Privacy-Preserving Survey Aggregation
//!
//! Computes per-question aggregates (numeric sums, option counts) over survey responses
//! that are secret-shared between an analyst and a coordinator. Neither holder sees an
//! individual response; only aggregates over enough valid responses are ever revealed.
//!
//! ## Overview
//!
//! For every question of a [`form::Form`] the protocol:
//!
//! - **Validates** each response under secret sharing, producing a secret 0/1 flag
//! - **Aggregates** responses masked by their flag, so invalid ones contribute nothing
//! - **Discloses** the sums only when at least
//!   [`disclosure::MIN_SUFFICIENT_RESPONSES`] responses were valid
//!
//! Secret arithmetic is delegated to a [`engine::SecretEngine`]. [`engine::LocalEngine`]
//! runs every party in-process.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use survey_aggregation::{
//!     config::AggregationConfig,
//!     engine::LocalEngine,
//!     form::{Form, NumericalQuestion, Question},
//!     respondent::{submit, Answer, Answers},
//!     session::{ComputationContext, ComputationId},
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let form = Arc::new(Form::new(
//!     "Commute",
//!     vec![Question::Numerical(NumericalQuestion {
//!         id: "minutes".into(),
//!         question: "How long is your commute?".into(),
//!         required: true,
//!         min: Some(1),
//!         max: Some(180),
//!     })],
//! ));
//! let engine = Arc::new(LocalEngine::new()?);
//! let context = ComputationContext::new(
//!     ComputationId::random(&form)?,
//!     form.clone(),
//!     engine.clone(),
//!     AggregationConfig::default(),
//! )?;
//! let roster = context.roster();
//! let begin = context.begin_handle();
//! let computation = tokio::spawn(context.run());
//!
//! for minutes in [25, 40, 15] {
//!     let party = roster.join().await?;
//!     let answers = Answers::from([("minutes".to_string(), Answer::Number(minutes))]);
//!     submit(engine.as_ref(), party, &form, &answers).await?;
//! }
//! begin.begin().await?;
//!
//! let results = computation.await??;
//! println!("{}", serde_json::to_string_pretty(&results)?);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod config;
pub mod disclosure;
pub mod engine;
pub mod error;
pub mod form;
pub mod orchestrator;
pub mod respondent;
pub mod result;
pub mod security;
pub mod session;
pub mod validity;

pub use error::AggregationError;
pub use result::AggregateResult;
