//! Move representation: a single ply ([`Move`]), its consequences
//! ([`MoveTag`]) and the [`MoveList`] a move generator fills.
//!
//! Moves are produced in two phases. The generator first builds the geometric
//! move and later annotates it (e.g. with [`MoveTag::CHECK`]) once the
//! candidate position has been examined. Only the producer can annotate: the
//! consumers receive frozen [`Move`] values.

use std::fmt;
use std::ops::Index;

use anyhow::bail;

use crate::chess::core::{Piece, PieceKind, Square};

/// Number of moves a [`MoveList`] reserves room for. The maximum number of
/// legal moves in a reachable chess position is 218, so a list that grows
/// past it most likely holds duplicates.
pub const MAX_MOVES: usize = 256;

bitflags::bitflags! {
    /// Notable consequences of a [`Move`]. An empty set is a "quiet" move:
    /// nothing beyond the piece relocation is asserted.
    ///
    /// The flags are independent and any subset is representable. Querying a
    /// composite set (e.g. `MoveTag::CAPTURE | MoveTag::CHECK`) through
    /// [`MoveTag::contains`] or [`Move::has_tag`] tests for *all* of them.
    ///
    /// ```
    /// use chessmove::chess::moves::MoveTag;
    ///
    /// let tags = MoveTag::CAPTURE | MoveTag::CHECK;
    /// assert!(tags.contains(MoveTag::CHECK));
    /// assert!(!tags.contains(MoveTag::CHECK | MoveTag::EN_PASSANT));
    /// assert_eq!(tags & MoveTag::CAPTURE, MoveTag::CAPTURE);
    /// ```
    ///
    /// The bit positions are an implementation detail: use the named flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct MoveTag: u16 {
        /// Short castle or O-O.
        const KING_SIDE_CASTLE = 1 << 0;
        /// Long castle or O-O-O.
        const QUEEN_SIDE_CASTLE = 1 << 1;
        /// The move captures a piece by any means, including en passant.
        /// This is the flag to test for "is this a capture".
        const CAPTURE = 1 << 2;
        /// The move is an [en passant] capture. It is set independently of
        /// [`MoveTag::CAPTURE`] and producers are expected to set both.
        ///
        /// [en passant]: https://en.wikipedia.org/wiki/En_passant
        const EN_PASSANT = 1 << 3;
        /// The move puts the opponent's king in check.
        const CHECK = 1 << 4;
    }
}

/// The move leaves the moving player's king in check and is therefore
/// illegal. Only move generation sets it, to filter pseudo-legal candidates.
#[allow(dead_code)]
pub(crate) const IN_CHECK: MoveTag = MoveTag::from_bits_retain(1 << 5);

/// The geometric identity of a move: origin, destination and promotion. It is
/// enough to name a legal move in any given position because at most one piece
/// stands on the origin square.
///
/// Serialized in [UCI format]:
///
/// ```
/// use chessmove::chess::core::{PieceKind, Square};
/// use chessmove::chess::moves::Geometry;
///
/// let promotion = Geometry::new(Square::E7, Square::E8, Some(PieceKind::Queen));
/// assert_eq!(promotion.to_string(), "e7e8q");
/// assert_eq!(Geometry::try_from("e7e8q").unwrap(), promotion);
/// ```
///
/// [UCI format]: http://wbec-ridderkerk.nl/html/UCIProtocol.html
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Geometry {
    #[allow(missing_docs)]
    pub from: Square,
    #[allow(missing_docs)]
    pub to: Square,
    #[allow(missing_docs)]
    pub promotion: Option<PieceKind>,
}

impl Geometry {
    #[allow(missing_docs)]
    #[must_use]
    pub const fn new(from: Square, to: Square, promotion: Option<PieceKind>) -> Self {
        Self {
            from,
            to,
            promotion,
        }
    }
}

impl TryFrom<&str> for Geometry {
    type Error = anyhow::Error;

    /// Parses a move in UCI format: origin, destination and an optional
    /// promotion letter (`e2e4`, `e7e8q`).
    ///
    /// # Errors
    ///
    /// If the input is not 4 or 5 ASCII characters long, contains an invalid
    /// square or the promotion is not one of queen, rook, bishop or knight.
    fn try_from(uci: &str) -> anyhow::Result<Self> {
        if !uci.is_ascii() || !(4..=5).contains(&uci.len()) {
            bail!("UCI move should be 4 or 5 ASCII chars, got '{uci}'");
        }
        let from = Square::try_from(&uci[0..2])?;
        let to = Square::try_from(&uci[2..4])?;
        let promotion = match uci[4..].chars().next() {
            None => None,
            Some(symbol) => match PieceKind::try_from(symbol) {
                Ok(kind) if kind.is_promotion_target() => Some(kind),
                _ => bail!("promotion should be one of 'qrbn', got '{symbol}'"),
            },
        };
        Ok(Self::new(from, to, promotion))
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(promotion) = self.promotion {
            write!(f, "{}", promotion.lowercase())?;
        }
        Ok(())
    }
}

/// A single ply: the piece that moves, where it moves from and to, what it
/// promotes to and what [consequences](MoveTag) the move has.
///
/// The move is stored verbatim and never validated. It is the producer's job
/// to refuse nonsensical moves (e.g. `from == to` or a promotion to a king).
///
/// Two moves are equal only when all of their fields are. Looking a move up by
/// its origin, destination and promotion is a separate concept, see
/// [`Move::geometry`] and [`MoveList::find`].
///
/// ```
/// use chessmove::chess::core::{Piece, PieceKind, Player, Square};
/// use chessmove::chess::moves::{Move, MoveTag};
///
/// let pawn_push = Move::new(
///     Square::E2,
///     Square::E4,
///     None,
///     Piece::new(Player::White, PieceKind::Pawn),
///     MoveTag::empty(),
/// );
/// assert_eq!(pawn_push.to_string(), "e2e4WhiteP");
/// assert!(!pawn_push.has_tag(MoveTag::CAPTURE));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Move {
    from: Square,
    to: Square,
    promotion: Option<PieceKind>,
    piece: Piece,
    tags: MoveTag,
}

impl Move {
    #[allow(missing_docs)]
    #[must_use]
    pub const fn new(
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
        piece: Piece,
        tags: MoveTag,
    ) -> Self {
        Self {
            from,
            to,
            promotion,
            piece,
            tags,
        }
    }

    /// Origin square.
    #[must_use]
    pub const fn from(&self) -> Square {
        self.from
    }

    /// Destination square.
    #[must_use]
    pub const fn to(&self) -> Square {
        self.to
    }

    /// The kind a pawn is promoted to or `None` when the move is not a
    /// promotion.
    #[must_use]
    pub const fn promotion(&self) -> Option<PieceKind> {
        self.promotion
    }

    /// The piece that moves.
    #[must_use]
    pub const fn piece(&self) -> Piece {
        self.piece
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn tags(&self) -> MoveTag {
        self.tags
    }

    /// Returns true if the move has every flag of `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: MoveTag) -> bool {
        self.tags.contains(tag)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn geometry(&self) -> Geometry {
        Geometry::new(self.from, self.to, self.promotion)
    }

    /// Annotates the move after its consequences were analyzed. Tags are only
    /// ever added.
    pub(crate) fn add_tag(&mut self, tag: MoveTag) {
        self.tags.insert(tag);
    }
}

impl fmt::Display for Move {
    /// Debug-friendly dump of the move: squares, promotion and the moving
    /// piece without separators, e.g. `e7e8QWhiteP`. This is *not* algebraic
    /// notation and is not meant to be parsed, use [`Move::geometry`] for UCI.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(promotion) = self.promotion {
            write!(f, "{promotion}")?;
        }
        write!(f, "{}{}", self.piece.color().name(), self.piece.kind())
    }
}

/// Producer side of [`Move`]: collects the geometry and the consequences and
/// hands out a frozen move.
///
/// ```
/// use chessmove::chess::core::{Piece, PieceKind, Player, Square};
/// use chessmove::chess::moves::{MoveBuilder, MoveTag};
///
/// let castle = MoveBuilder::new(
///     Square::E1,
///     Square::G1,
///     Piece::new(Player::White, PieceKind::King),
/// )
/// .tag(MoveTag::KING_SIDE_CASTLE)
/// .tag(MoveTag::CHECK)
/// .build();
/// assert!(castle.has_tag(MoveTag::KING_SIDE_CASTLE | MoveTag::CHECK));
/// ```
#[derive(Clone, Copy, Debug)]
#[must_use]
pub struct MoveBuilder {
    candidate: Move,
}

impl MoveBuilder {
    /// Starts a quiet, non-promoting move.
    pub const fn new(from: Square, to: Square, piece: Piece) -> Self {
        Self {
            candidate: Move::new(from, to, None, piece, MoveTag::empty()),
        }
    }

    #[allow(missing_docs)]
    pub fn promotion(mut self, kind: PieceKind) -> Self {
        self.candidate.promotion = Some(kind);
        self
    }

    /// Adds consequences to the move.
    pub fn tag(mut self, tag: MoveTag) -> Self {
        self.candidate.add_tag(tag);
        self
    }

    #[allow(missing_docs)]
    pub const fn build(self) -> Move {
        self.candidate
    }
}

/// Moves in the order they were generated. The order is never changed by
/// lookups.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveList {
    moves: Vec<Move>,
}

impl MoveList {
    /// Creates an empty list with room for [`MAX_MOVES`] moves.
    #[must_use]
    pub fn new() -> Self {
        Self {
            moves: Vec::with_capacity(MAX_MOVES),
        }
    }

    /// Appends the move to the end of the list. The list grows as needed.
    pub fn push(&mut self, m: Move) {
        if self.moves.len() == MAX_MOVES {
            log::warn!("move list grows past {MAX_MOVES} moves with {m}");
        }
        self.moves.push(m);
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn as_slice(&self) -> &[Move] {
        self.moves.as_slice()
    }

    /// Iterates over the moves in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Move> {
        self.moves.iter()
    }

    /// Returns the first move with the same origin, destination and promotion
    /// as `query`. The moving piece and the tags of `query` are ignored, which
    /// allows looking up a move from A to B without knowing what is there.
    ///
    /// ```
    /// use chessmove::chess::core::{Piece, PieceKind, Player, Square};
    /// use chessmove::chess::moves::{Move, MoveList, MoveTag};
    ///
    /// let knight = Piece::new(Player::White, PieceKind::Knight);
    /// let moves: MoveList = [Move::new(Square::G1, Square::F3, None, knight, MoveTag::empty())]
    ///     .into_iter()
    ///     .collect();
    /// let pawn = Piece::new(Player::White, PieceKind::Pawn);
    /// let query = Move::new(Square::G1, Square::F3, None, pawn, MoveTag::CHECK);
    /// assert_eq!(moves.find(&query), Some(&moves[0]));
    /// ```
    #[must_use]
    pub fn find(&self, query: &Move) -> Option<&Move> {
        self.find_geometry(&query.geometry())
    }

    /// Returns the first move with the given geometry.
    #[must_use]
    pub fn find_geometry(&self, geometry: &Geometry) -> Option<&Move> {
        self.moves.iter().find(|m| m.geometry() == *geometry)
    }

    /// Resolves a move in UCI format (e.g. `e7e8q`) against the list.
    ///
    /// # Errors
    ///
    /// If `uci` is not a well-formed UCI move. A well-formed move that is not
    /// in the list is `Ok(None)`.
    pub fn find_uci(&self, uci: &str) -> anyhow::Result<Option<&Move>> {
        Ok(self.find_geometry(&Geometry::try_from(uci)?))
    }

}

impl Index<usize> for MoveList {
    type Output = Move;

    fn index(&self, index: usize) -> &Self::Output {
        &self.moves[index]
    }
}

impl FromIterator<Move> for MoveList {
    fn from_iter<I: IntoIterator<Item = Move>>(iter: I) -> Self {
        let mut moves = Self::new();
        moves.extend(iter);
        moves
    }
}

impl Extend<Move> for MoveList {
    fn extend<I: IntoIterator<Item = Move>>(&mut self, iter: I) {
        for m in iter {
            self.push(m);
        }
    }
}

impl IntoIterator for MoveList {
    type IntoIter = std::vec::IntoIter<Move>;
    type Item = Move;

    fn into_iter(self) -> Self::IntoIter {
        self.moves.into_iter()
    }
}

impl<'a> IntoIterator for &'a MoveList {
    type IntoIter = std::slice::Iter<'a, Move>;
    type Item = &'a Move;

    fn into_iter(self) -> Self::IntoIter {
        self.moves.iter()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use strum::IntoEnumIterator;

    use super::*;
    use crate::chess::core::Player;

    const WHITE_PAWN: Piece = Piece::new(Player::White, PieceKind::Pawn);
    const WHITE_KING: Piece = Piece::new(Player::White, PieceKind::King);

    const SINGLE_TAGS: [MoveTag; 6] = [
        MoveTag::KING_SIDE_CASTLE,
        MoveTag::QUEEN_SIDE_CASTLE,
        MoveTag::CAPTURE,
        MoveTag::EN_PASSANT,
        MoveTag::CHECK,
        IN_CHECK,
    ];

    #[test]
    fn tags_are_independent_bits() {
        for (i, lhs) in SINGLE_TAGS.iter().enumerate() {
            assert_eq!(lhs.bits().count_ones(), 1);
            for rhs in &SINGLE_TAGS[i + 1..] {
                assert!((*lhs & *rhs).is_empty());
            }
        }
        assert!(!MoveTag::all().contains(IN_CHECK));
    }

    #[test]
    fn add_tag_after_construction() {
        let mut castle = Move::new(
            Square::E1,
            Square::G1,
            None,
            WHITE_KING,
            MoveTag::KING_SIDE_CASTLE,
        );
        castle.add_tag(MoveTag::CHECK);
        assert!(castle.has_tag(MoveTag::KING_SIDE_CASTLE));
        assert!(castle.has_tag(MoveTag::CHECK));
        assert!(!castle.has_tag(MoveTag::QUEEN_SIDE_CASTLE));
        assert_eq!(castle.tags(), MoveTag::KING_SIDE_CASTLE | MoveTag::CHECK);
    }

    #[test]
    fn add_tag_is_idempotent() {
        let mut capture = Move::new(Square::D4, Square::E5, None, WHITE_PAWN, MoveTag::CAPTURE);
        capture.add_tag(MoveTag::CHECK);
        let annotated = capture;
        capture.add_tag(MoveTag::CHECK);
        assert_eq!(capture, annotated);
        capture.add_tag(MoveTag::empty());
        assert_eq!(capture, annotated);
    }

    #[test]
    fn in_check_is_hidden_from_public_tags() {
        let mut illegal = MoveBuilder::new(Square::E1, Square::F2, WHITE_KING).build();
        illegal.add_tag(IN_CHECK);
        assert!(illegal.has_tag(IN_CHECK));
        for tag in MoveTag::all().iter() {
            assert!(!illegal.has_tag(tag));
        }
        assert_eq!(illegal.to_string(), "e1f2WhiteK");
        assert_ne!(illegal, MoveBuilder::new(Square::E1, Square::F2, WHITE_KING).build());
    }

    #[test]
    fn builder() {
        let promotion = MoveBuilder::new(Square::B7, Square::A8, WHITE_PAWN)
            .promotion(PieceKind::Knight)
            .tag(MoveTag::CAPTURE)
            .tag(MoveTag::CHECK)
            .build();
        assert_eq!(
            promotion,
            Move::new(
                Square::B7,
                Square::A8,
                Some(PieceKind::Knight),
                WHITE_PAWN,
                MoveTag::CAPTURE | MoveTag::CHECK,
            )
        );
        assert_eq!(promotion.to_string(), "b7a8NWhiteP");
    }

    #[test]
    fn debug_string() {
        let black_pawn = Piece::new(Player::Black, PieceKind::Pawn);
        assert_eq!(
            Move::new(Square::D2, Square::D1, Some(PieceKind::Rook), black_pawn, MoveTag::empty())
                .to_string(),
            "d2d1RBlackP"
        );
        let black_knight = Piece::new(Player::Black, PieceKind::Knight);
        assert_eq!(
            Move::new(Square::B8, Square::C6, None, black_knight, MoveTag::CHECK).to_string(),
            "b8c6BlackN"
        );
    }

    #[test]
    fn equality_includes_piece_and_tags() {
        let quiet = Move::new(Square::E2, Square::E4, None, WHITE_PAWN, MoveTag::empty());
        let checking = Move::new(Square::E2, Square::E4, None, WHITE_PAWN, MoveTag::CHECK);
        let king = Move::new(Square::E2, Square::E4, None, WHITE_KING, MoveTag::empty());
        assert_ne!(quiet, checking);
        assert_ne!(quiet, king);
        assert_eq!(quiet.geometry(), checking.geometry());
        assert_eq!(quiet.geometry(), king.geometry());
    }

    #[test]
    fn uci() {
        assert_eq!(
            Geometry::try_from("e2e4").unwrap(),
            Geometry::new(Square::E2, Square::E4, None)
        );
        assert_eq!(
            Geometry::try_from("a2a1N").unwrap(),
            Geometry::new(Square::A2, Square::A1, Some(PieceKind::Knight))
        );
        for promotion in PieceKind::iter().filter(|kind| kind.is_promotion_target()) {
            let geometry = Geometry::new(Square::H7, Square::H8, Some(promotion));
            assert_eq!(Geometry::try_from(geometry.to_string().as_str()).unwrap(), geometry);
        }
    }

    #[test]
    #[should_panic(expected = "UCI move should be 4 or 5 ASCII chars, got 'e2e'")]
    fn uci_too_short() {
        let _ = Geometry::try_from("e2e").unwrap();
    }

    #[test]
    #[should_panic(expected = "UCI move should be 4 or 5 ASCII chars, got 'e2é4'")]
    fn uci_not_ascii() {
        let _ = Geometry::try_from("e2é4").unwrap();
    }

    #[test]
    #[should_panic(expected = "rank should be within '1'..='8', got '9'")]
    fn uci_incorrect_square() {
        let _ = Geometry::try_from("e2e9").unwrap();
    }

    #[test]
    #[should_panic(expected = "promotion should be one of 'qrbn', got 'k'")]
    fn uci_incorrect_promotion() {
        let _ = Geometry::try_from("e7e8k").unwrap();
    }

    #[test]
    fn find_uci() {
        let moves: MoveList = [
            Move::new(Square::E7, Square::E8, Some(PieceKind::Queen), WHITE_PAWN, MoveTag::CHECK),
            Move::new(Square::E7, Square::E8, Some(PieceKind::Rook), WHITE_PAWN, MoveTag::CHECK),
        ]
        .into_iter()
        .collect();
        assert_eq!(moves.find_uci("e7e8r").unwrap(), Some(&moves[1]));
        assert_eq!(moves.find_uci("e7e8q").unwrap(), Some(&moves[0]));
        assert_eq!(moves.find_uci("e7e8").unwrap(), None);
        assert!(moves.find_uci("e7e8x").is_err());
    }

    #[test]
    fn push_grows_past_reserved_capacity() {
        let pawn_push = Move::new(Square::E2, Square::E4, None, WHITE_PAWN, MoveTag::empty());
        let mut moves = MoveList::new();
        assert!(moves.is_empty());
        for _ in 0..=MAX_MOVES {
            moves.push(pawn_push);
        }
        let last = Move::new(Square::H8, Square::A8, None, WHITE_KING, MoveTag::empty());
        moves.push(last);
        assert_eq!(moves.len(), MAX_MOVES + 2);
        assert!(std::ptr::eq(moves.find(&pawn_push).unwrap(), &moves[0]));
        assert_eq!(moves.find(&last), Some(&moves[MAX_MOVES + 1]));

        let collected: MoveList = std::iter::repeat(pawn_push).take(2 * MAX_MOVES).collect();
        assert_eq!(collected.len(), 2 * MAX_MOVES);
        assert!(collected.iter().all(|m| *m == pawn_push));
        assert_eq!(collected.as_slice().len(), 2 * MAX_MOVES);
    }

    fn square() -> impl Strategy<Value = Square> {
        (0..64u8).prop_map(|index| Square::try_from(index).unwrap())
    }

    fn promotion() -> impl Strategy<Value = Option<PieceKind>> {
        prop::option::of(prop::sample::select(PieceKind::iter().collect::<Vec<_>>()))
    }

    fn piece() -> impl Strategy<Value = Piece> {
        (
            prop::sample::select(Player::iter().collect::<Vec<_>>()),
            prop::sample::select(PieceKind::iter().collect::<Vec<_>>()),
        )
            .prop_map(|(owner, kind)| Piece::new(owner, kind))
    }

    fn tags() -> impl Strategy<Value = MoveTag> {
        (0..1u16 << 6).prop_map(MoveTag::from_bits_retain)
    }

    fn any_move() -> impl Strategy<Value = Move> {
        (square(), square(), promotion(), piece(), tags())
            .prop_map(|(from, to, promotion, piece, tags)| Move::new(from, to, promotion, piece, tags))
    }

    proptest! {
        #[test]
        fn accessors_return_fields(
            from in square(),
            to in square(),
            promotion in promotion(),
            piece in piece(),
            tags in tags()
        ) {
            let m = Move::new(from, to, promotion, piece, tags);
            prop_assert_eq!(m.from(), from);
            prop_assert_eq!(m.to(), to);
            prop_assert_eq!(m.promotion(), promotion);
            prop_assert_eq!(m.piece(), piece);
            prop_assert_eq!(m.tags(), tags);
            prop_assert_eq!(m.geometry(), Geometry::new(from, to, promotion));
        }

        #[test]
        fn has_tag_is_membership(m in any_move()) {
            for tag in SINGLE_TAGS {
                prop_assert_eq!(m.has_tag(tag), m.tags().bits() & tag.bits() != 0);
            }
        }

        #[test]
        fn add_tag_is_monotonic(m in any_move(), extra in tags()) {
            let mut annotated = m;
            annotated.add_tag(extra);
            prop_assert!(annotated.has_tag(extra));
            prop_assert!(annotated.tags().contains(m.tags()));
            let once = annotated;
            annotated.add_tag(extra);
            prop_assert_eq!(annotated, once);
            prop_assert_eq!(annotated.geometry(), m.geometry());
            prop_assert_eq!(annotated.piece(), m.piece());
        }

        #[test]
        fn find_returns_earliest_geometric_match(
            moves in prop::collection::vec(any_move(), 0..64),
            query in any_move()
        ) {
            let list: MoveList = moves.iter().copied().collect();
            let expected = moves.iter().position(|m| m.geometry() == query.geometry());
            match (list.find(&query), expected) {
                (Some(found), Some(index)) => prop_assert!(std::ptr::eq(found, &list[index])),
                (None, None) => (),
                (found, index) => prop_assert!(false, "found {:?}, expected index {:?}", found, index),
            }
        }

        #[test]
        fn find_ignores_piece_and_tags(
            moves in prop::collection::vec(any_move(), 1..32),
            index in any::<prop::sample::Index>(),
            piece in piece(),
            tags in tags()
        ) {
            let list: MoveList = moves.iter().copied().collect();
            let target = list[index.index(list.len())];
            let query = Move::new(target.from(), target.to(), target.promotion(), piece, tags);
            let found = list.find(&query);
            prop_assert!(found.is_some());
            prop_assert_eq!(found.map(Move::geometry), Some(target.geometry()));
        }
    }
}
