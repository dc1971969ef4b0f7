pub fn is_privileged() -> bool {
    false
}
