#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum SyntaxKind {
    LEFT_PAREN,
    RIGHT_PAREN,
    LEFT_BRACKET,
    RIGHT_BRACKET,
    LEFT_BRACE,
    RIGHT_BRACE,
    LESS,
    GREATER,
    COMMA,
    COLON,
    SEMICOLON,
    EQ,
    DOT,

    FUN_KW,
    IF_KW,
    LOOP_KW,
    VAL_KW,
    WHILE_KW,
    NAME,

    NUMBER,
    BINARY_OPERATOR,
    POSTFIX_OPERATOR,
    PREFIX_OPERATOR,

    UNKNOWN,
    EOF,

    WHITESPACE,
    NEWLINE,
    LINE_COMMENT,
    SKIPPED_TOKENS,

    LIST,
    MODULE,
    VAL_STMT,
    EXPR_STMT,
    NAME_REF,
    LITERAL,
    BINARY_EXPR,
    POSTFIX_EXPR,
    PREFIX_EXPR,
    PAREN_EXPR,
    CALL_EXPR,
    ARG_LIST,
    TYPE_ARGS,
    ERROR,
    TOMBSTONE,
}

impl SyntaxKind {
    /// Trivia is attached to the leading edge of the following token.
    pub const fn is_trivia(self) -> bool {
        matches!(
            self,
            SyntaxKind::WHITESPACE
                | SyntaxKind::NEWLINE
                | SyntaxKind::LINE_COMMENT
                | SyntaxKind::SKIPPED_TOKENS
        )
    }

    pub const fn is_list(self) -> bool {
        matches!(self, SyntaxKind::LIST)
    }
}
