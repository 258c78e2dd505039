pub mod composer;
pub mod converter;
pub mod decoder;
pub mod extractor;
pub mod registry;
pub mod unwrapper;

pub use composer::LinkComposer;
pub use converter::LinkConverter;
pub use extractor::IdentifierExtractor;
pub use registry::PatternRegistry;
pub use unwrapper::{AgentUnwrapper, Unwrapped};
