pub mod domain;
pub mod ports;
pub mod tags;
pub mod validation;
pub mod votes;

pub use domain::{
    Answer, AnswerItem, AuthSession, AuthorRef, Collection, Question, QuestionItem, Tag, User,
    UserCredentials, UserStats, Vote, VoteKind, VoteStatus, VoteTarget,
};
pub use ports::{DraftAnswerService, DraftStream, ForumStore, Page, PortError, PortResult};
pub use tags::{plan_tags, normalize_tags, AttachedTag, TagPlan};
pub use validation::{PaginatedQuery, ValidationErrors};
pub use votes::{CounterDelta, VoteTransition};
