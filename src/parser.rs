//! Parser for semi-structured recorded game text
//!
//! Recorded games arrive in uneven shape: some are clean PGN documents with
//! tag-pair headers, some are bare SAN move lists, and many sit in between
//! with brace comments, parenthesized variations, numeric annotation glyphs,
//! and continuation-dot markers sprinkled through the movetext.
//!
//! # Parsing strategy
//!
//! 1. **Full-document pass**: accept the complete grammar (headers, comments,
//!    nested variations, glyphs, move numbers, result tokens) and extract the
//!    mainline moves. Anything outside that grammar fails the pass.
//! 2. **Cleanup pass**: strip all structural noise and retry the remainder as
//!    a plain SAN move list.
//! 3. **Give up**: a second failure yields an empty move list, never an error.
//!    The UI shows "no moves loaded" instead of crashing.
//!
//! After token extraction the accepted SANs are replayed from the starting
//! position through the rules engine to fill board-level metadata (source and
//! destination squares, captures, checks). Replay legality is not enforced
//! here: if a recorded move stops applying mid-game, enrichment stops and the
//! remaining moves keep notation-derived fields only. Truncation on illegal
//! replay belongs to [`crate::timeline::Timeline`].

use shakmaty::san::{San, SanPlus, Suffix};
use shakmaty::{Chess, File, Move, Position, Square};
use tracing::{debug, warn};

use crate::error::{ReplayError, ReplayResult};
use crate::types::RecordedMove;

/// Result of parsing one recorded game
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedGame {
    /// Tag-pair headers in document order, e.g. `("Event", "Casual Game")`
    pub headers: Vec<(String, String)>,
    /// Mainline moves; variations are dropped
    pub moves: Vec<RecordedMove>,
}

/// Parse raw recorded game text into an ordered move list.
///
/// Never fails: unusable input degrades to an empty [`ParsedGame`].
pub fn parse_game(raw: &str) -> ParsedGame {
    match parse_document(raw, true) {
        Ok(game) => game,
        Err(first) => {
            debug!(error = %first, "full-document parse failed, retrying after cleanup");
            match parse_document(raw, false) {
                Ok(game) => game,
                Err(second) => {
                    warn!(error = %second, "recorded game unusable after cleanup, loading no moves");
                    ParsedGame::default()
                }
            }
        }
    }
}

/// Single parsing pass over the document.
///
/// In strict mode any malformed header, unbalanced comment or variation, or
/// unrecognized token is an error. In lenient mode structural noise is
/// stripped and only the surviving tokens must be valid SAN.
fn parse_document(raw: &str, strict: bool) -> ReplayResult<ParsedGame> {
    let (headers, movetext) = split_headers(raw, strict)?;
    let tokens = extract_move_tokens(&movetext, strict)?;

    let mut sans = Vec::with_capacity(tokens.len());
    for token in tokens {
        let san: SanPlus = token
            .parse()
            .map_err(|_| ReplayError::ParseFailed {
                reason: format!("unrecognized move token '{token}'"),
            })?;
        sans.push(san);
    }

    Ok(ParsedGame {
        headers,
        moves: enrich(sans),
    })
}

/// Split leading tag-pair lines from the movetext.
fn split_headers(raw: &str, strict: bool) -> ReplayResult<(Vec<(String, String)>, String)> {
    let mut headers = Vec::new();
    let mut movetext = String::new();
    let mut in_headers = true;

    for line in raw.lines() {
        let trimmed = line.trim();
        if in_headers && trimmed.starts_with('[') {
            match parse_tag_pair(trimmed) {
                Some(pair) => headers.push(pair),
                None if strict => {
                    return Err(ReplayError::ParseFailed {
                        reason: format!("malformed tag pair '{trimmed}'"),
                    })
                }
                // Lenient: header-shaped junk is dropped.
                None => {}
            }
            continue;
        }
        if !trimmed.is_empty() {
            in_headers = false;
        }
        movetext.push_str(line);
        movetext.push('\n');
    }

    Ok((headers, movetext))
}

/// Parse one `[Name "Value"]` tag-pair line.
fn parse_tag_pair(line: &str) -> Option<(String, String)> {
    let body = line.strip_prefix('[')?.strip_suffix(']')?.trim();
    let (name, rest) = body.split_once(char::is_whitespace)?;
    let value = rest.trim().strip_prefix('"')?.strip_suffix('"')?;
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.to_string()))
}

/// Extract candidate SAN tokens from movetext.
///
/// Drops brace and semicolon comments, parenthesized variations (nested),
/// numeric annotation glyphs, move-number and continuation markers, result
/// tokens, and trailing `!`/`?` glyph suffixes. Strict mode errors on
/// unbalanced comments or variations instead of tolerating them.
fn extract_move_tokens(movetext: &str, strict: bool) -> ReplayResult<Vec<String>> {
    let mut cleaned = String::with_capacity(movetext.len());
    let mut variation_depth = 0usize;
    let mut in_brace = false;
    let mut in_line_comment = false;

    for c in movetext.chars() {
        if in_line_comment {
            if c == '\n' {
                in_line_comment = false;
                cleaned.push(' ');
            }
            continue;
        }
        if in_brace {
            if c == '}' {
                in_brace = false;
                cleaned.push(' ');
            }
            continue;
        }
        match c {
            '{' => in_brace = true,
            ';' => in_line_comment = true,
            '(' => variation_depth += 1,
            ')' => {
                if variation_depth == 0 {
                    if strict {
                        return Err(ReplayError::ParseFailed {
                            reason: "unbalanced ')' in movetext".to_string(),
                        });
                    }
                } else {
                    variation_depth -= 1;
                }
                cleaned.push(' ');
            }
            _ if variation_depth > 0 => {}
            _ => cleaned.push(c),
        }
    }

    if strict && (in_brace || variation_depth > 0) {
        return Err(ReplayError::ParseFailed {
            reason: "unclosed comment or variation in movetext".to_string(),
        });
    }

    let mut tokens = Vec::new();
    for raw_token in cleaned.split_whitespace() {
        if let Some(token) = normalize_token(raw_token) {
            tokens.push(token);
        }
    }
    Ok(tokens)
}

/// Reduce one whitespace-delimited token to a SAN candidate, or drop it.
fn normalize_token(token: &str) -> Option<String> {
    // Game results and lone continuation markers carry no move.
    if matches!(token, "1-0" | "0-1" | "1/2-1/2" | "*" | "..." | "…") {
        return None;
    }
    // Numeric annotation glyph, e.g. "$14".
    if let Some(rest) = token.strip_prefix('$') {
        if rest.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }

    // Zero-style castling from older recorders, before move-number stripping.
    let token = match token.trim_end_matches(['!', '?']) {
        "0-0" => "O-O",
        "0-0-0" => "O-O-O",
        "0-0+" => "O-O+",
        "0-0#" => "O-O#",
        "0-0-0+" => "O-O-O+",
        "0-0-0#" => "O-O-O#",
        _ => token,
    };

    // Move numbers with continuation dots, attached ("12...Nf6") or not ("12.").
    let mut body = token;
    if body.starts_with(|c: char| c.is_ascii_digit()) {
        let digits = body.chars().take_while(char::is_ascii_digit).count();
        let after_digits = &body[digits..];
        let dots = after_digits.chars().take_while(|&c| c == '.').count();
        if dots == 0 {
            // A bare number with no dots is not a SAN move.
            return None;
        }
        body = &after_digits[dots..];
        if body.is_empty() {
            return None;
        }
    }

    // Evaluation glyph suffixes ("Nf3!?") are commentary, not notation.
    let body = body.trim_end_matches(['!', '?']);
    if body.is_empty() {
        return None;
    }

    Some(body.to_string())
}

/// Fill board-level metadata by replaying the SANs from the starting position.
fn enrich(sans: Vec<SanPlus>) -> Vec<RecordedMove> {
    let mut position = Some(Chess::default());
    let mut moves = Vec::with_capacity(sans.len());

    for (index, san_plus) in sans.into_iter().enumerate() {
        let san_text = san_plus.to_string();
        let resolved = position
            .as_ref()
            .and_then(|pos| san_plus.san.to_move(pos).ok().map(|m| (pos.clone(), m)));

        let record = match resolved {
            Some((mut pos, m)) => {
                let side = pos.turn();
                let (from, to) = move_endpoints(&m);
                let promotion = m.promotion();
                let is_capture = m.is_capture();
                pos.play_unchecked(&m);
                let record = RecordedMove {
                    index,
                    side,
                    san: san_text,
                    from,
                    to: Some(to),
                    promotion,
                    is_capture,
                    is_check: pos.is_check(),
                    is_checkmate: pos.is_checkmate(),
                };
                position = Some(pos);
                record
            }
            None => {
                // The notation stopped applying; keep what the text reveals
                // and leave legality handling to the timeline.
                position = None;
                syntactic_record(index, &san_plus, san_text)
            }
        };
        moves.push(record);
    }

    moves
}

/// Build a move record from notation alone, without a resolvable position.
fn syntactic_record(index: usize, san_plus: &SanPlus, san_text: String) -> RecordedMove {
    let side = crate::types::side_for_index(index);
    let (to, capture, promotion) = match san_plus.san {
        San::Normal {
            to,
            capture,
            promotion,
            ..
        } => (Some(to), capture, promotion),
        _ => (None, false, None),
    };
    RecordedMove {
        index,
        side,
        san: san_text,
        from: None,
        to,
        promotion,
        is_capture: capture,
        is_check: matches!(san_plus.suffix, Some(Suffix::Check) | Some(Suffix::Checkmate)),
        is_checkmate: matches!(san_plus.suffix, Some(Suffix::Checkmate)),
    }
}

/// Source and destination squares of a rules-engine move.
///
/// Castling is encoded king-takes-rook by the rules engine; UI consumers
/// expect the king's actual landing square instead.
pub(crate) fn move_endpoints(m: &Move) -> (Option<Square>, Square) {
    match *m {
        Move::Castle { king, rook } => (Some(king), castle_king_target(king, rook)),
        _ => (m.from(), m.to()),
    }
}

/// King landing square for a castling move: g-file kingside, c-file queenside.
pub(crate) fn castle_king_target(king: Square, rook: Square) -> Square {
    let file = if rook.file() > king.file() {
        File::G
    } else {
        File::C
    };
    Square::from_coords(file, king.rank())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::{Role, Square};

    const CLEAN: &str = "e4 e5 Nf3 Nc6 Bc4";

    const DECORATED: &str = r#"[Event "Casual Game"]
[Site "Club"]

1. e4 {taking the center} e5 2. Nf3 $1 (2. f4 exf4 {the gambit}) 2... Nc6
3. Bc4! 1-0"#;

    fn san_list(game: &ParsedGame) -> Vec<&str> {
        game.moves.iter().map(|m| m.san.as_str()).collect()
    }

    #[test]
    fn test_plain_move_list_parses() {
        //! A bare SAN list parses on the full-document pass
        let game = parse_game(CLEAN);
        assert_eq!(san_list(&game), vec!["e4", "e5", "Nf3", "Nc6", "Bc4"]);
        assert!(game.headers.is_empty());
    }

    #[test]
    fn test_decorated_game_matches_cleaned_equivalent() {
        //! Comments, variations, glyphs, and continuation markers do not
        //! change the extracted mainline
        let decorated = parse_game(DECORATED);
        let clean = parse_game(CLEAN);
        assert_eq!(decorated.moves, clean.moves);
    }

    #[test]
    fn test_headers_are_retained() {
        //! Tag pairs survive parsing for UI display
        let game = parse_game(DECORATED);
        assert_eq!(
            game.headers,
            vec![
                ("Event".to_string(), "Casual Game".to_string()),
                ("Site".to_string(), "Club".to_string()),
            ]
        );
    }

    #[test]
    fn test_unbalanced_comment_recovers_via_cleanup() {
        //! An unclosed brace fails the strict pass but the cleanup pass
        //! still extracts the moves before it
        let game = parse_game("1. e4 e5 2. Nf3 {never closed");
        assert_eq!(san_list(&game), vec!["e4", "e5", "Nf3"]);
    }

    #[test]
    fn test_garbage_degrades_to_empty() {
        //! Unusable text yields an empty move list, not an error
        let game = parse_game("this is not a chess game at all");
        assert!(game.moves.is_empty());
        assert!(game.headers.is_empty());
    }

    #[test]
    fn test_empty_input_yields_empty_game() {
        let game = parse_game("");
        assert!(game.moves.is_empty());
    }

    #[test]
    fn test_metadata_enrichment() {
        //! Replaying through the rules engine fills squares and flags
        let game = parse_game("e4 d5 exd5");
        let capture = &game.moves[2];
        assert_eq!(capture.san, "exd5");
        assert!(capture.is_capture);
        assert_eq!(capture.from, Some(Square::E4));
        assert_eq!(capture.to, Some(Square::D5));
        assert_eq!(game.moves[0].side, shakmaty::Color::White);
        assert_eq!(game.moves[1].side, shakmaty::Color::Black);
    }

    #[test]
    fn test_check_and_mate_flags() {
        //! Scholar's mate sets check and checkmate flags on the final ply
        let game = parse_game("e4 e5 Bc4 Nc6 Qh5 Nf6 Qxf7#");
        let mate = game.moves.last().expect("moves parsed");
        assert!(mate.is_capture);
        assert!(mate.is_check);
        assert!(mate.is_checkmate);
    }

    #[test]
    fn test_promotion_token() {
        //! Promotion notation resolves the promoted role
        let game = parse_game("1. e4 d5 2. exd5 c6 3. dxc6 Qd7 4. cxb7 Qd8 5. bxa8=Q");
        let promo = game.moves.last().expect("moves parsed");
        assert_eq!(promo.promotion, Some(Role::Queen));
        assert_eq!(promo.to, Some(Square::A8));
    }

    #[test]
    fn test_zero_style_castling_normalized() {
        //! "0-0" from older recorders parses as kingside castling
        let game = parse_game("e4 e5 Nf3 Nc6 Bc4 Bc5 0-0");
        let castle = game.moves.last().expect("moves parsed");
        assert_eq!(castle.san, "O-O");
        assert_eq!(castle.from, Some(Square::E1));
        assert_eq!(castle.to, Some(Square::G1));
    }

    #[test]
    fn test_enrichment_stops_at_unreplayable_move() {
        //! Moves past a dead end keep notation-derived fields only
        let game = parse_game("e4 e5 Nf3 Nf3 d4");
        assert_eq!(game.moves.len(), 5);
        // First three resolved against the board.
        assert_eq!(game.moves[2].from, Some(Square::G1));
        // Black cannot play Nf3; from here only the notation is known.
        assert_eq!(game.moves[3].from, None);
        assert_eq!(game.moves[3].to, Some(Square::F3));
        assert_eq!(game.moves[4].from, None);
        assert_eq!(game.moves[4].to, Some(Square::D4));
    }
}
