//! docqa-rag
//!
//! Retrieval and answering on top of `docqa-core` and `docqa-vector`.

pub mod corpus;
pub mod pipeline;
pub mod policy;
pub mod retriever;
pub mod session;

pub use corpus::{Corpus, CorpusStats};
pub use pipeline::answer_question;
pub use policy::{Answer, AnswerKind, AnswerPolicy, Outcome};
pub use retriever::{retrieve, RetrievalResult, RetrievedPassage, Retriever};
pub use session::Session;
