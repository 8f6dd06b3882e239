pub(crate) mod token_reader;
