// Token alphabet for CTF streams.
//
// Opcode values are fixed by the CTF 2.1 format and shared with the
// external tokenizers that produce the streams.  Every language's
// tokens live in one flat byte-valued alphabet; this module only
// classifies and displays them, it never interprets grammar.

// ---------------------------------------------------------------------------
// File structure opcodes
// ---------------------------------------------------------------------------

/// End of stream.
pub const EOFTOKEN: u8 = 0;
/// Start of a new source file: 4-byte timestamp + NUL-terminated path follow.
pub const FILENAME: u8 = 9;
/// One physical newline in the source file.  Zero payload.
pub const LINE: u8 = 10;

// ---------------------------------------------------------------------------
// C opcodes
// ---------------------------------------------------------------------------

pub const RS_ASSIGN: u8 = 13;
pub const DIV_ASSIGN: u8 = 32;
pub const NOT: u8 = 33;
pub const STRINGLIT: u8 = 34;
pub const ARROW: u8 = 35;
pub const INCR: u8 = 36;
pub const MOD: u8 = 37;
pub const AND: u8 = 38;
pub const CHARCONST: u8 = 39;
pub const OPENPAREN: u8 = 40;
pub const CLOSEPAREN: u8 = 41;
pub const MULT: u8 = 42;
pub const PLUS: u8 = 43;
pub const COMMA: u8 = 44;
pub const MINUS: u8 = 45;
pub const DOT: u8 = 46;
pub const DIV: u8 = 47;
pub const DECR: u8 = 48;
pub const ANDAND: u8 = 49;
pub const OROR: u8 = 50;
pub const PLUS_ASSIGN: u8 = 51;
pub const MOD_ASSIGN: u8 = 52;
pub const MINUS_ASSIGN: u8 = 53;
pub const AND_ASSIGN: u8 = 54;
pub const MULT_ASSIGN: u8 = 55;
pub const OR_ASSIGN: u8 = 56;
pub const INTVAL: u8 = 57;
pub const COLON: u8 = 58;
pub const SEMICOLON: u8 = 59;
pub const LT: u8 = 60;
pub const EQUALS: u8 = 61;
pub const GT: u8 = 62;
pub const QUESTION: u8 = 63;
pub const NE: u8 = 64;
pub const LE: u8 = 65;
pub const CASE: u8 = 66;
pub const CHAR: u8 = 67;
pub const CONST: u8 = 68;
pub const CONTINUE: u8 = 69;
pub const DEFAULT: u8 = 70;
pub const DO: u8 = 71;
pub const ELLIPSIS: u8 = 72;
pub const DOUBLE: u8 = 73;
pub const ELSE: u8 = 74;
pub const ENUM: u8 = 75;
pub const EXTERN: u8 = 76;
pub const FLOAT: u8 = 77;
pub const FOR: u8 = 78;
pub const GOTO: u8 = 79;
pub const IF: u8 = 80;
pub const INT: u8 = 81;
pub const LONG: u8 = 82;
pub const REGISTER: u8 = 83;
pub const RETURN: u8 = 84;
pub const SHORT: u8 = 85;
pub const SIGNED: u8 = 86;
pub const SIZEOF: u8 = 87;
pub const STATIC: u8 = 88;
pub const STRUCT: u8 = 89;
pub const SWITCH: u8 = 90;
pub const OPENBRACKET: u8 = 91;
pub const BACKSLASH: u8 = 92;
pub const CLOSEBRACKET: u8 = 93;
pub const CARET: u8 = 94;
pub const IDENTIFIER: u8 = 95;
pub const LABEL: u8 = 96;
pub const TYPEDEF: u8 = 97;
pub const UNION: u8 = 98;
pub const UNSIGNED: u8 = 99;
pub const VOID: u8 = 100;
pub const VOLATILE: u8 = 101;
pub const WHILE: u8 = 102;
pub const HASH_DEFINE: u8 = 103;
pub const HASH_ELIF: u8 = 104;
pub const HASH_ELSE: u8 = 105;
pub const HASH_ENDIF: u8 = 106;
pub const HASH_ERROR: u8 = 107;
pub const HASH_IFDEF: u8 = 108;
pub const HASH_IF: u8 = 109;
pub const HASH_IFNDEF: u8 = 110;
pub const HASH_INCLUDE: u8 = 111;
pub const HASH_LINE: u8 = 112;
pub const HASH_PRAGMA: u8 = 113;
pub const HASH_UNDEF: u8 = 114;
pub const HASH_WARNING: u8 = 115;
pub const XOR_ASSIGN: u8 = 116;
pub const EQ: u8 = 117;
pub const BREAK: u8 = 118;
pub const GE: u8 = 119;
pub const LS: u8 = 120;
pub const RS: u8 = 121;
pub const LS_ASSIGN: u8 = 122;
pub const OPENCURLY: u8 = 123;
pub const OR: u8 = 124;
pub const CLOSECURLY: u8 = 125;
pub const TILDE: u8 = 126;

// ---------------------------------------------------------------------------
// Java / Python / Perl opcodes
// ---------------------------------------------------------------------------

pub const ABSTRACT: u8 = 127;
pub const BOOLEAN: u8 = 128;
pub const BYTE: u8 = 129;
pub const EXTENDS: u8 = 130;
pub const FINAL: u8 = 131;
pub const FINALLY: u8 = 132;
pub const IMPLEMENTS: u8 = 133;
pub const IMPORT: u8 = 134;
pub const INSTANCEOF: u8 = 135;
pub const INTERFACE: u8 = 136;
pub const NATIVE: u8 = 137;
pub const NEW: u8 = 138;
pub const JAVANULL: u8 = 139;
pub const PACKAGE: u8 = 140;
pub const PRIVATE: u8 = 141;
pub const PROTECTED: u8 = 142;
pub const PUBLIC: u8 = 143;
pub const STRICTFP: u8 = 144;
pub const SUPER: u8 = 145;
pub const SYNCHRONIZED: u8 = 146;
pub const THIS: u8 = 147;
pub const THROW: u8 = 148;
pub const THROWS: u8 = 149;
pub const TRANSIENT: u8 = 150;
pub const TRY: u8 = 151;
pub const URS: u8 = 152;
pub const URS_ASSIGN: u8 = 153;
pub const INDENT: u8 = 154;
pub const OUTDENT: u8 = 155;
pub const XOR: u8 = 156;
pub const CLASS: u8 = 157;
pub const FUNCTION: u8 = 158;
pub const IS: u8 = 159;
pub const NONE: u8 = 160;
pub const EXCEPT: u8 = 161;
pub const AS: u8 = 162;
pub const ASSERT: u8 = 163;
pub const DEL: u8 = 164;
pub const ELIF: u8 = 165;
pub const EXEC: u8 = 166;
pub const FROM: u8 = 167;
pub const GLOBAL: u8 = 168;
pub const IN: u8 = 169;
pub const LAMBDA: u8 = 170;
pub const PASS: u8 = 171;
pub const PRINT: u8 = 172;
pub const WITH: u8 = 173;
pub const YIELD: u8 = 174;
pub const TYPE: u8 = 175;
pub const EXP_ASSIGN: u8 = 176;
pub const EXP: u8 = 177;
pub const INTDIV_ASSIGN: u8 = 178;
pub const INTDIV: u8 = 179;
pub const DECORATOR: u8 = 180;
pub const DOLLAR: u8 = 181;
pub const ATSIGN: u8 = 182;
pub const EQTILDE: u8 = 183;
pub const BACKTICK: u8 = 184;

/// Highest opcode value in the alphabet.
pub const MAX_OPCODE: u8 = BACKTICK;

/// True for the five opcodes that carry a 16-bit id payload.
#[inline(always)]
pub fn carries_id(op: u8) -> bool {
    matches!(op, STRINGLIT | CHARCONST | INTVAL | IDENTIFIER | LABEL)
}

/// True for the two opcodes whose id values may be remapped during
/// isomorphic comparison.  Literal ids (strings, chars, ints) must
/// always match exactly.
#[inline(always)]
pub fn remappable(op: u8) -> bool {
    matches!(op, IDENTIFIER | LABEL)
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

/// Fixed textual form of an opcode, used by the token printer.
/// Unknown opcodes render as `"ERR "`.
pub fn display(op: u8) -> &'static str {
    match op {
        LINE => "\n",
        RS_ASSIGN => ">>= ",
        DIV_ASSIGN => "/= ",
        NOT => "! ",
        STRINGLIT => "\"string\"",
        ARROW => "->",
        INCR => "++ ",
        MOD => "% ",
        AND => "& ",
        CHARCONST => "'c'",
        OPENPAREN => "( ",
        CLOSEPAREN => ") ",
        MULT => "* ",
        PLUS => "+ ",
        COMMA => ", ",
        MINUS => "- ",
        DOT => ". ",
        DIV => "/ ",
        DECR => "-- ",
        ANDAND => "&& ",
        OROR => "|| ",
        PLUS_ASSIGN => "+= ",
        MOD_ASSIGN => "%= ",
        MINUS_ASSIGN => "-= ",
        AND_ASSIGN => "&= ",
        MULT_ASSIGN => "*= ",
        OR_ASSIGN => "|= ",
        INTVAL => "NUM",
        COLON => ": ",
        SEMICOLON => "; ",
        LT => "< ",
        EQUALS => "= ",
        GT => "> ",
        QUESTION => "? ",
        NE => "!= ",
        LE => "<= ",
        CASE => "case ",
        CHAR => "char ",
        CONST => "const ",
        CONTINUE => "continue ",
        DEFAULT => "default ",
        DO => "do ",
        ELLIPSIS => "...",
        DOUBLE => "double ",
        ELSE => "else ",
        ENUM => "enum ",
        EXTERN => "extern ",
        FLOAT => "float ",
        FOR => "for ",
        GOTO => "goto ",
        IF => "if ",
        INT => "int ",
        LONG => "long ",
        REGISTER => "register ",
        RETURN => "return ",
        SHORT => "short ",
        SIGNED => "signed ",
        SIZEOF => "sizeof ",
        STATIC => "static ",
        STRUCT => "struct ",
        SWITCH => "switch ",
        OPENBRACKET => "[ ",
        BACKSLASH => "\\",
        CLOSEBRACKET => "] ",
        CARET => "^ ",
        IDENTIFIER => "id",
        LABEL => "label: ",
        TYPEDEF => "typedef ",
        UNION => "union ",
        UNSIGNED => "unsigned ",
        VOID => "void ",
        VOLATILE => "volatile ",
        WHILE => "while ",
        HASH_DEFINE => "#define ",
        HASH_ELIF => "#elif ",
        HASH_ELSE => "#else ",
        HASH_ENDIF => "#endif ",
        HASH_ERROR => "#error ",
        HASH_IFDEF => "#ifdef ",
        HASH_IF => "#if ",
        HASH_IFNDEF => "#ifndef ",
        HASH_INCLUDE => "#include ",
        HASH_LINE => "#line ",
        HASH_PRAGMA => "#pragma ",
        HASH_UNDEF => "#undef ",
        HASH_WARNING => "#warning ",
        XOR_ASSIGN => "^= ",
        EQ => "== ",
        BREAK => "break ",
        GE => ">= ",
        LS => "<< ",
        RS => ">> ",
        LS_ASSIGN => "<<= ",
        OPENCURLY => "{ ",
        OR => "| ",
        CLOSECURLY => "} ",
        TILDE => "~ ",
        ABSTRACT => "abstract ",
        BOOLEAN => "boolean ",
        BYTE => "byte ",
        EXTENDS => "extends ",
        FINAL => "final ",
        FINALLY => "finally ",
        IMPLEMENTS => "implements ",
        IMPORT => "import ",
        INSTANCEOF => "instanceof ",
        INTERFACE => "interface ",
        NATIVE => "native ",
        NEW => "new ",
        JAVANULL => "null ",
        PACKAGE => "package ",
        PRIVATE => "private ",
        PROTECTED => "protected ",
        PUBLIC => "public ",
        STRICTFP => "strictfp ",
        SUPER => "super ",
        SYNCHRONIZED => "synchronized ",
        THIS => "this ",
        THROW => "throw ",
        THROWS => "throws ",
        TRANSIENT => "transient ",
        TRY => "try ",
        URS => ">>> ",
        URS_ASSIGN => ">>>= ",
        INDENT => "INDENT ",
        OUTDENT => "OUTDENT ",
        XOR => "^ ",
        CLASS => "class ",
        FUNCTION => "def ",
        IS => "is ",
        NONE => "None ",
        EXCEPT => "except ",
        AS => "as ",
        ASSERT => "assert ",
        DEL => "del ",
        ELIF => "elif ",
        EXEC => "exec ",
        FROM => "from ",
        GLOBAL => "global ",
        IN => "in ",
        LAMBDA => "lambda ",
        PASS => "pass ",
        PRINT => "print ",
        WITH => "with ",
        YIELD => "yield ",
        TYPE => "type ",
        EXP_ASSIGN => "**= ",
        EXP => "**",
        INTDIV_ASSIGN => "//= ",
        INTDIV => "// ",
        DECORATOR => "@ ",
        DOLLAR => "$",
        ATSIGN => "@",
        EQTILDE => "=~ ",
        BACKTICK => "`",
        _ => "ERR ",
    }
}

/// Write one token in detok form: filenames start a new block, lines
/// restart the left margin, id-bearing tokens append their value.
pub fn write_token<W: std::io::Write>(
    w: &mut W,
    op: u8,
    linenum: u32,
    id: u32,
    filename: &str,
) -> std::io::Result<()> {
    match op {
        FILENAME => write!(w, "\n\n{filename}:\t(mtime {id})\n{linenum:5}:   "),
        LINE => write!(w, "\n{linenum:5}:   "),
        IDENTIFIER | INTVAL => write!(w, "{}{id} ", display(op)),
        STRINGLIT => write!(w, "\"str{id}\" "),
        LABEL => write!(w, "L{id}: "),
        CHARCONST => write!(w, "'c{id}' "),
        _ => w.write_all(display(op).as_bytes()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_bearing_classification() {
        for op in [STRINGLIT, CHARCONST, INTVAL, IDENTIFIER, LABEL] {
            assert!(carries_id(op));
        }
        for op in [EOFTOKEN, FILENAME, LINE, SEMICOLON, WHILE, BACKTICK] {
            assert!(!carries_id(op));
        }
    }

    #[test]
    fn only_identifiers_and_labels_remap() {
        assert!(remappable(IDENTIFIER));
        assert!(remappable(LABEL));
        assert!(!remappable(INTVAL));
        assert!(!remappable(STRINGLIT));
        assert!(!remappable(CHARCONST));
    }

    #[test]
    fn display_covers_alphabet() {
        assert_eq!(display(WHILE), "while ");
        assert_eq!(display(URS_ASSIGN), ">>>= ");
        assert_eq!(display(200), "ERR ");
    }
}
