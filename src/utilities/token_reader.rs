use std::{io::BufRead, str::FromStr};

use crate::errors::SGError;

///
/// Single-pass whitespace tokenizer over a buffered reader. Reads one line at
/// a time and never seeks.
///
pub(crate) struct TokenReader<R: BufRead>
{
    reader: R,
    line: String,
    pos: usize,
}

impl<R: BufRead> TokenReader<R>
{
    pub(crate) fn new(reader: R) -> Self
    {
        Self { reader, line: String::new(), pos: 0 }
    }

    pub(crate) fn next_token(&mut self, what: &'static str) -> Result<&str, SGError>
    {
        let (start, end) = loop
        {
            let rest = &self.line[self.pos..];
            let trimmed = rest.trim_start();
            if !trimmed.is_empty()
            {
                let start = self.pos + (rest.len() - trimmed.len());
                let end = trimmed.find(char::is_whitespace).map_or(self.line.len(), |e| start + e);
                break (start, end);
            }
            self.line.clear();
            self.pos = 0;
            if self.reader.read_line(&mut self.line)? == 0
            {
                return Err(SGError::UnexpectedEndOfInput(what));
            }
        };
        self.pos = end;
        Ok(&self.line[start..end])
    }

    pub(crate) fn parse<T: FromStr>(&mut self, what: &'static str) -> Result<T, SGError>
    {
        let token = self.next_token(what)?;
        token.parse::<T>().map_err(|_| SGError::InvalidToken { token: token.to_owned(), expected: what })
    }

    ///
    /// Flags are written as `0`/`1`.
    ///
    pub(crate) fn parse_flag(&mut self, what: &'static str) -> Result<bool, SGError>
    {
        let value: u8 = self.parse(what)?;
        match value
        {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(SGError::InvalidToken { token: value.to_string(), expected: what }),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn tokens_span_lines()
    {
        let mut reader = TokenReader::new("  6 2\n\n 17\tx\n".as_bytes());
        assert_eq!(reader.parse::<i64>("version").unwrap(), 6);
        assert_eq!(reader.parse::<usize>("dimension").unwrap(), 2);
        assert_eq!(reader.parse::<usize>("count").unwrap(), 17);
        assert!(matches!(reader.parse::<usize>("level"), Err(SGError::InvalidToken { .. })));
        assert!(matches!(reader.next_token("index"), Err(SGError::UnexpectedEndOfInput("index"))));
    }

    #[test]
    fn flags_must_be_binary()
    {
        let mut reader = TokenReader::new("1 0 2".as_bytes());
        assert!(reader.parse_flag("flag").unwrap());
        assert!(!reader.parse_flag("flag").unwrap());
        assert!(reader.parse_flag("flag").is_err());
    }
}
