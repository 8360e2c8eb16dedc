/// Returns the OS user's display name, falling back to the login name.
pub fn get_name() -> String {
    let name = whoami::realname();
    if name.is_empty() {
        return whoami::username();
    }
    name
}
