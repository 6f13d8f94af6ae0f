//! Board listings as seen by one principal.

use serde::Serialize;

use crate::access::{can_administer_board, can_view};
use crate::models::{Board, Principal};

/// A board annotated for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardListing {
    #[serde(flatten)]
    pub board: Board,
    pub show_delete_button: bool,
}

impl BoardListing {
    pub fn for_principal(principal: &Principal, board: Board) -> Self {
        let show_delete_button = can_administer_board(principal, &board);
        Self {
            board,
            show_delete_button,
        }
    }
}

/// `None` matches boards in either state.
pub fn is_visible(principal: &Principal, board: &Board, archived: Option<bool>) -> bool {
    archived.is_none_or(|a| board.is_archived == a) && can_view(principal, board)
}

/// Keeps the boards `principal` may see and annotates them, preserving order.
pub fn visible_listings<I>(principal: &Principal, boards: I, archived: Option<bool>) -> Vec<BoardListing>
where
    I: IntoIterator<Item = Board>,
{
    boards
        .into_iter()
        .filter(|b| is_visible(principal, b, archived))
        .map(|b| BoardListing::for_principal(principal, b))
        .collect()
}
