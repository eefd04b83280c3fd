//! Best-effort Java and build-tool version probing.
//!
//! Purely diagnostic: the retry matrix is what actually decides which
//! toolchain builds the project, but knowing what the project declares
//! makes a failed run much easier to read. Every probe degrades to `None`
//! on missing or unparseable files.

use std::path::Path;

use regex::Regex;
use tracing::debug;

use javerify_core::{BuildStack, DetectedVersions};

/// Probe the project's declared Java and build-tool versions.
pub fn detect_versions(project_path: &Path, stack: BuildStack) -> DetectedVersions {
    let mut versions = match stack {
        BuildStack::Maven => detect_maven(project_path),
        BuildStack::Gradle => detect_gradle(project_path),
        BuildStack::Javac => DetectedVersions {
            java_version: infer_from_source(project_path),
            build_tool_version: None,
        },
    };

    if versions.java_version.is_none() {
        versions.java_version = Some("17".to_string());
    }

    debug!(
        java = versions.java_version.as_deref(),
        tool = versions.build_tool_version.as_deref(),
        "version detection"
    );
    versions
}

fn detect_maven(project_path: &Path) -> DetectedVersions {
    let java_version = std::fs::read_to_string(project_path.join("pom.xml"))
        .ok()
        .and_then(|raw| java_version_from_pom(&raw));

    let build_tool_version = maven_wrapper_version(project_path).or_else(|| Some("3.9".to_string()));

    DetectedVersions {
        java_version,
        build_tool_version,
    }
}

fn java_version_from_pom(raw: &str) -> Option<String> {
    let doc = roxmltree::Document::parse(raw).ok()?;
    let root = doc.root_element();

    // Tag comparisons go through the local name: real poms carry the
    // Maven xmlns and namespaced names would never match otherwise.
    let named = |name: &'static str| move |n: &roxmltree::Node| n.tag_name().name() == name;

    // Properties block, most specific declaration first.
    if let Some(properties) = root.children().find(named("properties")) {
        for tag in ["java.version", "maven.compiler.source", "maven.compiler.target"] {
            if let Some(text) = properties
                .children()
                .find(|n| n.tag_name().name() == tag)
                .and_then(|n| n.text())
            {
                return Some(normalize_java_version(text));
            }
        }
    }

    // maven-compiler-plugin <source> configuration.
    for plugin in root.descendants().filter(|n| n.tag_name().name() == "plugin") {
        let is_compiler = plugin
            .children()
            .find(named("artifactId"))
            .and_then(|n| n.text())
            == Some("maven-compiler-plugin");
        if !is_compiler {
            continue;
        }
        if let Some(source) = plugin
            .descendants()
            .find(named("source"))
            .and_then(|n| n.text())
        {
            return Some(normalize_java_version(source));
        }
    }

    None
}

fn maven_wrapper_version(project_path: &Path) -> Option<String> {
    let candidates = [
        project_path.join("maven-wrapper.properties"),
        project_path.join(".mvn/wrapper/maven-wrapper.properties"),
    ];
    let re = Regex::new(r"apache-maven/([0-9]+\.[0-9]+\.[0-9]+)/").expect("valid regex");

    for path in candidates {
        if let Ok(content) = std::fs::read_to_string(&path) {
            if let Some(captures) = re.captures(&content) {
                return Some(captures[1].to_string());
            }
        }
    }
    None
}

fn detect_gradle(project_path: &Path) -> DetectedVersions {
    let build_file = ["build.gradle", "build.gradle.kts"]
        .iter()
        .map(|f| project_path.join(f))
        .find(|p| p.is_file());

    let java_version = build_file
        .and_then(|p| std::fs::read_to_string(p).ok())
        .and_then(|content| java_version_from_gradle(&content));

    let build_tool_version = gradle_wrapper_version(project_path).or_else(|| Some("8".to_string()));

    DetectedVersions {
        java_version,
        build_tool_version,
    }
}

fn java_version_from_gradle(content: &str) -> Option<String> {
    let patterns = [
        r#"sourceCompatibility\s*=\s*['"]?(\d+)['"]?"#,
        r#"targetCompatibility\s*=\s*['"]?(\d+)['"]?"#,
        r"JavaLanguageVersion\.of\((\d+)\)",
    ];

    for pattern in patterns {
        let re = Regex::new(pattern).expect("valid regex");
        if let Some(captures) = re.captures(content) {
            return Some(normalize_java_version(&captures[1]));
        }
    }
    None
}

fn gradle_wrapper_version(project_path: &Path) -> Option<String> {
    let content =
        std::fs::read_to_string(project_path.join("gradle/wrapper/gradle-wrapper.properties"))
            .ok()?;
    let re = Regex::new(r"gradle-([0-9]+\.[0-9]+(?:\.[0-9]+)?)-").expect("valid regex");
    re.captures(&content).map(|c| c[1].to_string())
}

/// Infer a minimum Java version from language features in loose sources.
/// Mapped to LTS releases only.
fn infer_from_source(project_path: &Path) -> Option<String> {
    let mut checked = 0usize;
    let entries = std::fs::read_dir(project_path).ok()?;

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("java") {
            continue;
        }
        if checked >= 5 {
            break;
        }
        checked += 1;

        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };
        if content.contains("record ") || content.contains("sealed ") {
            return Some("17".to_string());
        }
        if content.contains("switch ") && content.contains("->") {
            return Some("17".to_string());
        }
        if content.contains("var ") {
            return Some("11".to_string());
        }
    }

    if checked > 0 {
        Some("11".to_string())
    } else {
        None
    }
}

/// `1.8` style versions map to their minor; `17.0.1` style to their major.
fn normalize_java_version(version: &str) -> String {
    let version = version.trim();
    let mut parts = version.split('.');
    match parts.next() {
        Some("1") => parts.next().unwrap_or("8").to_string(),
        Some(major) => major.to_string(),
        None => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, content).expect("write");
    }

    #[test]
    fn test_normalize_legacy_and_modern_versions() {
        assert_eq!(normalize_java_version("1.8"), "8");
        assert_eq!(normalize_java_version("11"), "11");
        assert_eq!(normalize_java_version("17.0.1"), "17");
        assert_eq!(normalize_java_version(" 8 "), "8");
    }

    #[test]
    fn test_pom_java_version_property() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(
            &dir.path().join("pom.xml"),
            r#"<project>
  <properties>
    <java.version>1.8</java.version>
  </properties>
</project>"#,
        );

        let versions = detect_versions(dir.path(), BuildStack::Maven);
        assert_eq!(versions.java_version.as_deref(), Some("8"));
        assert_eq!(versions.build_tool_version.as_deref(), Some("3.9"));
    }

    #[test]
    fn test_pom_with_maven_namespace() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(
            &dir.path().join("pom.xml"),
            r#"<project xmlns="http://maven.apache.org/POM/4.0.0">
  <properties>
    <maven.compiler.source>11</maven.compiler.source>
  </properties>
</project>"#,
        );

        let versions = detect_versions(dir.path(), BuildStack::Maven);
        assert_eq!(versions.java_version.as_deref(), Some("11"));
    }

    #[test]
    fn test_pom_compiler_plugin_source() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(
            &dir.path().join("pom.xml"),
            r#"<project>
  <build>
    <plugins>
      <plugin>
        <artifactId>maven-compiler-plugin</artifactId>
        <configuration>
          <source>11</source>
          <target>11</target>
        </configuration>
      </plugin>
    </plugins>
  </build>
</project>"#,
        );

        let versions = detect_versions(dir.path(), BuildStack::Maven);
        assert_eq!(versions.java_version.as_deref(), Some("11"));
    }

    #[test]
    fn test_maven_wrapper_version_from_distribution_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(&dir.path().join("pom.xml"), "<project/>");
        write(
            &dir.path().join(".mvn/wrapper/maven-wrapper.properties"),
            "distributionUrl=https://repo.maven.apache.org/maven2/org/apache/maven/apache-maven/3.9.6/apache-maven-3.9.6-bin.zip\n",
        );

        let versions = detect_versions(dir.path(), BuildStack::Maven);
        assert_eq!(versions.build_tool_version.as_deref(), Some("3.9.6"));
    }

    #[test]
    fn test_unparseable_pom_falls_back_to_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(&dir.path().join("pom.xml"), "<project><unclosed>");

        let versions = detect_versions(dir.path(), BuildStack::Maven);
        assert_eq!(versions.java_version.as_deref(), Some("17"));
    }

    #[test]
    fn test_gradle_source_compatibility() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(
            &dir.path().join("build.gradle"),
            "plugins { id 'java' }\nsourceCompatibility = '11'\n",
        );

        let versions = detect_versions(dir.path(), BuildStack::Gradle);
        assert_eq!(versions.java_version.as_deref(), Some("11"));
        assert_eq!(versions.build_tool_version.as_deref(), Some("8"));
    }

    #[test]
    fn test_gradle_toolchain_language_version() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(
            &dir.path().join("build.gradle.kts"),
            "java { toolchain { languageVersion = JavaLanguageVersion.of(21) } }\n",
        );

        let versions = detect_versions(dir.path(), BuildStack::Gradle);
        assert_eq!(versions.java_version.as_deref(), Some("21"));
    }

    #[test]
    fn test_gradle_wrapper_version() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(
            &dir.path().join("gradle/wrapper/gradle-wrapper.properties"),
            "distributionUrl=https\\://services.gradle.org/distributions/gradle-8.4-bin.zip\n",
        );

        let versions = detect_versions(dir.path(), BuildStack::Gradle);
        assert_eq!(versions.build_tool_version.as_deref(), Some("8.4"));
    }

    #[test]
    fn test_javac_source_feature_inference() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(
            &dir.path().join("Point.java"),
            "public record Point(int x, int y) {}\n",
        );

        let versions = detect_versions(dir.path(), BuildStack::Javac);
        assert_eq!(versions.java_version.as_deref(), Some("17"));
        assert_eq!(versions.build_tool_version, None);
    }

    #[test]
    fn test_javac_plain_sources_default_to_11() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(
            &dir.path().join("Main.java"),
            "public class Main { public static void main(String[] a) {} }\n",
        );

        let versions = detect_versions(dir.path(), BuildStack::Javac);
        assert_eq!(versions.java_version.as_deref(), Some("11"));
    }
}
