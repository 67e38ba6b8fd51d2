pub mod component;
pub mod question;

pub use component::{Component, ComponentStore, Graphic, Item, ItemOption, ItemOptions};
pub use question::{AnswerInputs, BasicInput, MatchPair, Question, QuestionKind};
