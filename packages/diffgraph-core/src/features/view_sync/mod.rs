// Selection and visibility synchronizer
//
// Propagates selection and show/hide state between the four views.
// Synchronized mode moves an element's siblings in every view;
// independent mode touches only the view the change originated in.

mod sync;

pub use sync::SelectionSummary;
