use windows::Win32::UI::Shell::IsUserAnAdmin;

/// Elevated token check; some CIM classes return partial data otherwise.
pub fn is_privileged() -> bool {
    unsafe { IsUserAnAdmin().as_bool() }
}
