/// Outcome of asking a record to move to a new status
#[derive(Debug, Clone, PartialEq)]
pub enum Transition<T, S> {
    /// No record with that id
    NotFound,
    /// Already in the requested status; nothing written
    Unchanged(T),
    Applied { record: T, previous: S },
    /// The status machine does not allow this move
    Rejected { current: S },
}
