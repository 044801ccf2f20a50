use crate::compiler::compiler::Compiler;
use crate::compiler::Result;
use crate::lexer::TokenKind;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! -
    Call,       // . ()
    Primary,
}

impl Precedence {
    /// One level tighter, used for the right operand of a left-associative
    /// binary operator.
    pub fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call | Precedence::Primary => Precedence::Primary,
        }
    }
}

pub type ParseFn = fn(&mut Compiler, bool) -> Result<()>;

pub struct ParseRule {
    pub prefix: Option<ParseFn>,
    pub infix: Option<ParseFn>,
    pub precedence: Precedence,
}

const fn rule(prefix: Option<ParseFn>, infix: Option<ParseFn>, precedence: Precedence) -> ParseRule {
    ParseRule {
        prefix,
        infix,
        precedence,
    }
}

const NONE: ParseRule = rule(None, None, Precedence::None);

/// Indexed by `TokenKind as usize`; rows follow the declaration order of
/// `TokenKind`.
#[rustfmt::skip]
static RULES: [ParseRule; TokenKind::COUNT] = [
    /* LeftParen    */ rule(Some(Compiler::grouping as ParseFn), None, Precedence::None),
    /* RightParen   */ NONE,
    /* LeftBrace    */ NONE,
    /* RightBrace   */ NONE,
    /* LeftBracket  */ NONE,
    /* RightBracket */ NONE,
    /* Comma        */ NONE,
    /* Dot          */ NONE,
    /* Minus        */ rule(Some(Compiler::unary as ParseFn), Some(Compiler::binary as ParseFn), Precedence::Term),
    /* Plus         */ rule(None, Some(Compiler::binary as ParseFn), Precedence::Term),
    /* Semicolon    */ NONE,
    /* Slash        */ rule(None, Some(Compiler::binary as ParseFn), Precedence::Factor),
    /* Star         */ rule(None, Some(Compiler::binary as ParseFn), Precedence::Factor),
    /* Bang         */ rule(Some(Compiler::unary as ParseFn), None, Precedence::None),
    /* BangEqual    */ rule(None, Some(Compiler::binary as ParseFn), Precedence::Equality),
    /* Equal        */ NONE,
    /* EqualEqual   */ rule(None, Some(Compiler::binary as ParseFn), Precedence::Equality),
    /* Greater      */ rule(None, Some(Compiler::binary as ParseFn), Precedence::Comparison),
    /* GreaterEqual */ rule(None, Some(Compiler::binary as ParseFn), Precedence::Comparison),
    /* Less         */ rule(None, Some(Compiler::binary as ParseFn), Precedence::Comparison),
    /* LessEqual    */ rule(None, Some(Compiler::binary as ParseFn), Precedence::Comparison),
    /* Arrow        */ NONE,
    /* Identifier   */ rule(Some(Compiler::variable as ParseFn), None, Precedence::None),
    /* String       */ rule(Some(Compiler::string as ParseFn), None, Precedence::None),
    /* Number       */ rule(Some(Compiler::number as ParseFn), None, Precedence::None),
    /* And          */ rule(None, Some(Compiler::and as ParseFn), Precedence::And),
    /* Break        */ NONE,
    /* Class        */ NONE,
    /* Continue     */ NONE,
    /* Else         */ NONE,
    /* False        */ rule(Some(Compiler::literal as ParseFn), None, Precedence::None),
    /* For          */ NONE,
    /* Fun          */ NONE,
    /* If           */ NONE,
    /* Nil          */ rule(Some(Compiler::literal as ParseFn), None, Precedence::None),
    /* Or           */ rule(None, Some(Compiler::or as ParseFn), Precedence::Or),
    /* Print        */ NONE,
    /* Return       */ NONE,
    /* Super        */ NONE,
    /* This         */ NONE,
    /* True         */ rule(Some(Compiler::literal as ParseFn), None, Precedence::None),
    /* Var          */ NONE,
    /* While        */ NONE,
    /* Eof          */ NONE,
];

pub fn get_rule(kind: TokenKind) -> &'static ParseRule {
    &RULES[kind as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_case::test_case;

    #[test_case(TokenKind::Minus, true, true, Precedence::Term ; "minus")]
    #[test_case(TokenKind::Plus, false, true, Precedence::Term ; "plus")]
    #[test_case(TokenKind::Star, false, true, Precedence::Factor ; "star")]
    #[test_case(TokenKind::Slash, false, true, Precedence::Factor ; "slash")]
    #[test_case(TokenKind::Bang, true, false, Precedence::None ; "bang")]
    #[test_case(TokenKind::BangEqual, false, true, Precedence::Equality ; "bang equal")]
    #[test_case(TokenKind::EqualEqual, false, true, Precedence::Equality ; "equal equal")]
    #[test_case(TokenKind::Equal, false, false, Precedence::None ; "equal")]
    #[test_case(TokenKind::LessEqual, false, true, Precedence::Comparison ; "less equal")]
    #[test_case(TokenKind::Arrow, false, false, Precedence::None ; "arrow")]
    #[test_case(TokenKind::Identifier, true, false, Precedence::None ; "identifier")]
    #[test_case(TokenKind::String, true, false, Precedence::None ; "string")]
    #[test_case(TokenKind::Number, true, false, Precedence::None ; "number")]
    #[test_case(TokenKind::And, false, true, Precedence::And ; "and")]
    #[test_case(TokenKind::Or, false, true, Precedence::Or ; "or")]
    #[test_case(TokenKind::Nil, true, false, Precedence::None ; "nil")]
    #[test_case(TokenKind::True, true, false, Precedence::None ; "true")]
    #[test_case(TokenKind::Var, false, false, Precedence::None ; "var")]
    #[test_case(TokenKind::Eof, false, false, Precedence::None ; "eof")]
    fn test_rule(kind: TokenKind, prefix: bool, infix: bool, precedence: Precedence) {
        let rule = get_rule(kind);

        assert_eq!(rule.prefix.is_some(), prefix);
        assert_eq!(rule.infix.is_some(), infix);
        assert_eq!(rule.precedence, precedence)
    }

    #[test]
    fn levels_are_ordered() {
        assert!(Precedence::None < Precedence::Assignment);
        assert!(Precedence::Or < Precedence::And);
        assert!(Precedence::Term < Precedence::Factor);
        assert!(Precedence::Factor < Precedence::Unary);
        assert_eq!(Precedence::Term.next(), Precedence::Factor);
        assert_eq!(Precedence::Primary.next(), Precedence::Primary)
    }
}
