//! GNU target triplets for cross toolchains, e.g. `arm-linux-gnueabihf`.

use anyhow::{Result, bail};

fn machine(os: &str, arch: &str) -> Option<&'static str> {
    let exact = match arch {
        "x86" if os == "Linux" => Some("x86"),
        "x86" => Some("i686"),
        "x86_64" => Some("x86_64"),
        "armv8" | "armv8_32" | "armv8.3" => Some("aarch64"),
        "asm.js" => Some("asmjs"),
        "wasm" => Some("wasm32"),
        _ => None,
    };
    if exact.is_some() {
        return exact;
    }

    // Families matched by substring, most specific first.
    const FAMILIES: &[(&str, &str)] = &[
        ("arm", "arm"),
        ("ppc64le", "powerpc64le"),
        ("ppc64", "powerpc64"),
        ("ppc32", "powerpc"),
        ("mips64", "mips64"),
        ("mips", "mips"),
        ("sparcv9", "sparc64"),
        ("sparc", "sparc"),
        ("s390x", "s390x-ibm"),
        ("s390", "s390-ibm"),
        ("sh4", "sh4"),
        ("e2k", "e2k-unknown"),
    ];
    FAMILIES
        .iter()
        .find(|(needle, _)| arch.contains(*needle))
        .map(|(_, machine)| *machine)
}

fn operating_system(os: &str, arch: &str, compiler: Option<&str>) -> String {
    let mut system = match os {
        "Windows" => match compiler {
            Some("Visual Studio") | Some("msvc") => "windows-msvc".to_string(),
            _ => "w64-mingw32".to_string(),
        },
        "Linux" => "linux-gnu".to_string(),
        "Android" => "linux-android".to_string(),
        "Darwin" | "Macos" | "iOS" | "watchOS" | "tvOS" => "apple-darwin".to_string(),
        "FreeBSD" => "freebsd".to_string(),
        "SunOS" => "solaris".to_string(),
        other => other.to_lowercase(),
    };

    if os == "Linux" || os == "Android" {
        if arch.contains("arm") && !arch.contains("armv8") {
            system.push_str("eabi");
        }
        if os == "Linux" {
            match arch {
                "armv5hf" | "armv7hf" => system.push_str("hf"),
                "armv8_32" => system.push_str("_ilp32"),
                _ => {}
            }
        }
    }
    system
}

/// GNU triplet for an `os`/`arch` pair, using the settings naming
/// (`Linux`, `Macos`, `armv7hf`, `armv8`, ...).
///
/// Windows needs the compiler to tell MinGW from MSVC.
pub fn gnu_triplet(os: &str, arch: &str, compiler: Option<&str>) -> Result<String> {
    if os == "Windows" && compiler.is_none() {
        bail!("'compiler' parameter for 'gnu_triplet()' is not specified and needed for os=Windows");
    }
    let Some(machine) = machine(os, arch) else {
        bail!("Unknown '{}' machine, can't translate it to the GNU triplet", arch);
    };
    Ok(format!("{}-{}", machine, operating_system(os, arch, compiler)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_triplets() {
        let cases: &[(&str, &str, Option<&str>, &str)] = &[
            ("Linux", "x86", None, "x86-linux-gnu"),
            ("Linux", "x86_64", None, "x86_64-linux-gnu"),
            ("Linux", "armv6", None, "arm-linux-gnueabi"),
            ("Linux", "sparc", None, "sparc-linux-gnu"),
            ("Linux", "sparcv9", None, "sparc64-linux-gnu"),
            ("Linux", "mips", None, "mips-linux-gnu"),
            ("Linux", "mips64", None, "mips64-linux-gnu"),
            ("Linux", "ppc32", None, "powerpc-linux-gnu"),
            ("Linux", "ppc64", None, "powerpc64-linux-gnu"),
            ("Linux", "ppc64le", None, "powerpc64le-linux-gnu"),
            ("Linux", "armv5te", None, "arm-linux-gnueabi"),
            ("Linux", "arm_whatever", None, "arm-linux-gnueabi"),
            ("Linux", "armv7hf", None, "arm-linux-gnueabihf"),
            ("Linux", "armv6", None, "arm-linux-gnueabi"),
            ("Linux", "armv7", None, "arm-linux-gnueabi"),
            ("Linux", "armv8_32", None, "aarch64-linux-gnu_ilp32"),
            ("Linux", "armv5el", None, "arm-linux-gnueabi"),
            ("Linux", "armv5hf", None, "arm-linux-gnueabihf"),
            ("Linux", "s390", None, "s390-ibm-linux-gnu"),
            ("Linux", "s390x", None, "s390x-ibm-linux-gnu"),
            ("Android", "x86", None, "i686-linux-android"),
            ("Android", "x86_64", None, "x86_64-linux-android"),
            ("Android", "armv6", None, "arm-linux-androideabi"),
            ("Android", "armv7", None, "arm-linux-androideabi"),
            ("Android", "armv7hf", None, "arm-linux-androideabi"),
            ("Android", "armv8", None, "aarch64-linux-android"),
            ("Windows", "x86", Some("Visual Studio"), "i686-windows-msvc"),
            ("Windows", "x86", Some("gcc"), "i686-w64-mingw32"),
            ("Windows", "x86_64", Some("gcc"), "x86_64-w64-mingw32"),
            ("Darwin", "x86_64", None, "x86_64-apple-darwin"),
            ("Macos", "x86", None, "i686-apple-darwin"),
            ("iOS", "armv7", None, "arm-apple-darwin"),
            ("watchOS", "armv7k", None, "arm-apple-darwin"),
            ("watchOS", "armv8_32", None, "aarch64-apple-darwin"),
            ("tvOS", "armv8", None, "aarch64-apple-darwin"),
            ("tvOS", "armv8.3", None, "aarch64-apple-darwin"),
            ("Emscripten", "asm.js", None, "asmjs-emscripten"),
            ("Emscripten", "wasm", None, "wasm32-emscripten"),
            ("AIX", "ppc32", None, "powerpc-aix"),
            ("AIX", "ppc64", None, "powerpc64-aix"),
            ("FreeBSD", "x86_64", None, "x86_64-freebsd"),
            ("SunOS", "sparcv9", None, "sparc64-solaris"),
        ];
        for (os, arch, compiler, expected) in cases {
            assert_eq!(
                gnu_triplet(os, arch, *compiler).unwrap(),
                *expected,
                "{os}/{arch}/{compiler:?}"
            );
        }
    }

    #[test]
    fn test_windows_requires_compiler() {
        let err = gnu_triplet("Windows", "x86", None).unwrap_err();
        assert!(err.to_string().contains("needed for os=Windows"));
    }

    #[test]
    fn test_unknown_machine() {
        let err = gnu_triplet("Linux", "z80", None).unwrap_err();
        assert!(err.to_string().contains("Unknown 'z80' machine"));
    }
}
