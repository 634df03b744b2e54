pub mod answer;
pub mod group;
pub mod question;
pub mod user;

pub use answer::{AnswerSheet, FeedbackSheet, QuestionPrompt, ScoreReport, SubmittedAnswer};
pub use group::Group;
pub use question::{BoolAnswer, BooleanQuestion, Question, QuestionTaken};
pub use test::{EligibleRecipients, QuestionOverview, StandardTest, Test, TestDetails};
pub use user::{AccountType, User};
