// Match editor
//
// Transactional add/remove of matches between unmatched elements; the
// only component that creates or destroys diff elements after build.

mod editor;
