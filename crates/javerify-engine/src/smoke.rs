//! Smoke-test synthesis for projects that ship no tests.
//!
//! Scans the project's Java sources to pick a strategy, then writes JUnit 5
//! sources under `src/test/java/generated`. The generated directory is
//! removed after execution regardless of the outcome; the candidate tree
//! must not keep synthesized files.

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info};
use walkdir::WalkDir;

use javerify_core::{Result, SmokeStrategy};

const GENERATED_DIR: &str = "src/test/java/generated";
const MAX_MAIN_CLASSES: usize = 3;
const MAX_LIBRARY_FILES: usize = 5;
const MAX_LIBRARY_CLASSES: usize = 3;

/// What one synthesis pass produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SmokeGeneration {
    pub strategy: SmokeStrategy,
    /// Generated files, relative to the project root.
    pub files: Vec<String>,
}

/// A fully-qualified class pulled out of a source file.
#[derive(Debug, Clone)]
struct ClassRef {
    name: String,
    qualified: String,
}

pub struct SmokeTestSynthesizer {
    package_re: Regex,
    class_re: Regex,
}

impl Default for SmokeTestSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SmokeTestSynthesizer {
    pub fn new() -> Self {
        Self {
            package_re: Regex::new(r"package\s+([\w.]+)\s*;").expect("valid regex"),
            class_re: Regex::new(r"public\s+class\s+(\w+)").expect("valid regex"),
        }
    }

    /// Pick a strategy from the project's sources and write the matching
    /// smoke tests.
    pub fn generate(&self, project_path: &Path) -> Result<SmokeGeneration> {
        let analysis = self.analyze(project_path);

        let generation = if analysis.spring_boot {
            self.write_spring_boot_tests(project_path)?
        } else if analysis.web_app {
            self.write_web_app_tests(project_path)?
        } else if !analysis.main_class_files.is_empty() {
            self.write_cli_tests(project_path, &analysis.main_class_files)?
        } else {
            self.write_library_tests(project_path, &analysis.source_files)?
        };

        info!(
            strategy = ?generation.strategy,
            files = generation.files.len(),
            "smoke tests synthesized"
        );
        Ok(generation)
    }

    /// Remove the generated test directory. Idempotent.
    pub fn cleanup(&self, project_path: &Path) {
        let dir = project_path.join(GENERATED_DIR);
        if dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                tracing::warn!(error = %e, "could not remove generated tests");
            }
        }
    }

    fn analyze(&self, project_path: &Path) -> ProjectAnalysis {
        let mut analysis = ProjectAnalysis::default();

        for entry in WalkDir::new(project_path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("java") {
                continue;
            }
            let rel = path.strip_prefix(project_path).unwrap_or(path);
            if is_excluded(rel) {
                continue;
            }

            let Ok(content) = std::fs::read_to_string(path) else {
                continue;
            };

            if content.contains("public static void main(") {
                analysis.main_class_files.push(path.to_path_buf());
            }
            if ["@SpringBootApplication", "@EnableAutoConfiguration", "@RestController", "@Controller"]
                .iter()
                .any(|a| content.contains(a))
            {
                analysis.spring_boot = true;
            }
            if ["HttpServlet", "@RequestMapping", "@GetMapping", "@PostMapping", "ServletContext"]
                .iter()
                .any(|i| content.contains(i))
            {
                analysis.web_app = true;
            }

            analysis.source_files.push(path.to_path_buf());
        }

        debug!(
            sources = analysis.source_files.len(),
            mains = analysis.main_class_files.len(),
            spring_boot = analysis.spring_boot,
            web_app = analysis.web_app,
            "project analysis"
        );
        analysis
    }

    fn extract_class(&self, path: &Path) -> Option<ClassRef> {
        let content = std::fs::read_to_string(path).ok()?;
        let name = self
            .class_re
            .captures(&content)
            .map(|c| c[1].to_string())
            .or_else(|| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            })?;
        let qualified = match self.package_re.captures(&content) {
            Some(c) => format!("{}.{name}", &c[1]),
            None => name.clone(),
        };
        Some(ClassRef { name, qualified })
    }

    fn write_spring_boot_tests(&self, project_path: &Path) -> Result<SmokeGeneration> {
        let file = self.write_test(project_path, "GeneratedSmokeTest.java", SPRING_BOOT_TEMPLATE)?;
        Ok(SmokeGeneration {
            strategy: SmokeStrategy::SpringBoot,
            files: vec![file],
        })
    }

    fn write_web_app_tests(&self, project_path: &Path) -> Result<SmokeGeneration> {
        let file = self.write_test(project_path, "GeneratedWebAppSmokeTest.java", WEB_APP_TEMPLATE)?;
        Ok(SmokeGeneration {
            strategy: SmokeStrategy::WebApp,
            files: vec![file],
        })
    }

    fn write_cli_tests(
        &self,
        project_path: &Path,
        main_class_files: &[PathBuf],
    ) -> Result<SmokeGeneration> {
        let mut files = Vec::new();

        for (i, path) in main_class_files.iter().take(MAX_MAIN_CLASSES).enumerate() {
            let Some(class) = self.extract_class(path) else {
                continue;
            };
            let ordinal = i + 1;
            let content = CLI_TEMPLATE
                .replace("{ordinal}", &ordinal.to_string())
                .replace("{qualified}", &class.qualified);
            files.push(self.write_test(
                project_path,
                &format!("GeneratedCliSmokeTest{ordinal}.java"),
                &content,
            )?);
        }

        if files.is_empty() {
            // No extractable main class; fall back to the library shape.
            return self.write_library_tests(project_path, &[]);
        }

        Ok(SmokeGeneration {
            strategy: SmokeStrategy::CliMain,
            files,
        })
    }

    fn write_library_tests(
        &self,
        project_path: &Path,
        source_files: &[PathBuf],
    ) -> Result<SmokeGeneration> {
        let classes: Vec<ClassRef> = source_files
            .iter()
            .take(MAX_LIBRARY_FILES)
            .filter_map(|p| self.extract_class(p))
            .take(MAX_LIBRARY_CLASSES)
            .collect();

        let class_tests: String = classes
            .iter()
            .map(|class| {
                LIBRARY_CLASS_TEST
                    .replace("{lower}", &class.name.to_lowercase())
                    .replace("{name}", &class.name)
                    .replace("{qualified}", &class.qualified)
            })
            .collect();

        let content = LIBRARY_TEMPLATE.replace("{class_tests}", &class_tests);
        let file = self.write_test(project_path, "GeneratedLibrarySmokeTest.java", &content)?;
        Ok(SmokeGeneration {
            strategy: SmokeStrategy::Library,
            files: vec![file],
        })
    }

    fn write_test(&self, project_path: &Path, name: &str, content: &str) -> Result<String> {
        let dir = project_path.join(GENERATED_DIR);
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join(name), content)?;
        Ok(format!("{GENERATED_DIR}/{name}"))
    }
}

#[derive(Debug, Default)]
struct ProjectAnalysis {
    source_files: Vec<PathBuf>,
    main_class_files: Vec<PathBuf>,
    spring_boot: bool,
    web_app: bool,
}

fn is_excluded(rel: &Path) -> bool {
    let in_excluded_dir = rel.components().any(|c| {
        c.as_os_str().to_str().is_some_and(|name| {
            matches!(name, "target" | "build" | "out" | "generated" | ".git")
                || name.eq_ignore_ascii_case("test")
                || name.eq_ignore_ascii_case("tests")
        })
    });

    // Sources following the test-class naming convention are test code
    // even when they live outside a test directory.
    let test_named_file = rel
        .file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| {
            stem.starts_with("Test")
                || stem.ends_with("Test")
                || stem.ends_with("Tests")
                || stem.ends_with("IT")
        });

    in_excluded_dir || test_named_file
}

const SPRING_BOOT_TEMPLATE: &str = r#"package generated;

import org.junit.jupiter.api.Test;
import org.springframework.boot.test.context.SpringBootTest;
import org.springframework.boot.test.web.client.TestRestTemplate;
import org.springframework.boot.test.web.server.LocalServerPort;
import org.springframework.boot.test.context.SpringBootTest.WebEnvironment;
import org.springframework.http.ResponseEntity;
import org.springframework.http.HttpStatus;
import static org.junit.jupiter.api.Assertions.*;

@SpringBootTest(webEnvironment = WebEnvironment.RANDOM_PORT)
public class GeneratedSmokeTest {

    @LocalServerPort
    private int port;

    private TestRestTemplate restTemplate = new TestRestTemplate();

    @Test
    public void contextLoads() {
        assertTrue(true, "Spring Boot context loaded successfully");
    }

    @Test
    public void healthEndpointSmokeTest() {
        try {
            String url = "http://localhost:" + port + "/actuator/health";
            ResponseEntity<String> response = restTemplate.getForEntity(url, String.class);
            assertTrue(
                response.getStatusCode() == HttpStatus.OK ||
                response.getStatusCode() == HttpStatus.NOT_FOUND,
                "Health endpoint should be accessible or properly return 404"
            );
        } catch (Exception e) {
            assertTrue(true, "Health endpoint test completed (actuator may not be configured)");
        }
    }

    @Test
    public void rootEndpointSmokeTest() {
        try {
            String url = "http://localhost:" + port + "/";
            ResponseEntity<String> response = restTemplate.getForEntity(url, String.class);
            assertNotNull(response.getStatusCode(), "Root endpoint should respond");
            assertTrue(response.getStatusCode().value() < 500,
                      "Root endpoint should not return server error");
        } catch (Exception e) {
            fail("Application should be accessible on configured port: " + e.getMessage());
        }
    }

    @Test
    public void applicationStartupSmokeTest() {
        assertTrue(port > 0, "Application should start on a valid port");
        assertTrue(port < 65536, "Port should be within valid range");
    }
}
"#;

const WEB_APP_TEMPLATE: &str = r#"package generated;

import org.junit.jupiter.api.Test;
import static org.junit.jupiter.api.Assertions.*;

public class GeneratedWebAppSmokeTest {

    @Test
    public void servletContextSmokeTest() {
        assertTrue(true, "Web application smoke test - basic validation");
    }

    @Test
    public void classLoadingSmokeTest() {
        try {
            Class.forName("javax.servlet.http.HttpServlet");
            assertTrue(true, "Servlet API classes accessible");
        } catch (ClassNotFoundException e) {
            assertTrue(true, "Servlet API not found - may be using different web framework");
        }
    }
}
"#;

const CLI_TEMPLATE: &str = r#"package generated;

import org.junit.jupiter.api.Test;
import org.junit.jupiter.api.Timeout;
import static org.junit.jupiter.api.Assertions.*;
import java.io.ByteArrayOutputStream;
import java.io.PrintStream;
import java.util.concurrent.TimeUnit;

public class GeneratedCliSmokeTest{ordinal} {

    @Test
    @Timeout(value = 30, unit = TimeUnit.SECONDS)
    public void mainMethodSmokeTest() {
        ByteArrayOutputStream outputStream = new ByteArrayOutputStream();
        PrintStream originalOut = System.out;
        System.setOut(new PrintStream(outputStream));
        try {
            {qualified}.main(new String[0]);
            assertTrue(true, "Main method executed without exceptions");
        } catch (Exception e) {
            String message = e.getMessage();
            if (message != null && (
                message.contains("file not found") ||
                message.contains("invalid argument") ||
                message.contains("missing parameter") ||
                message.contains("usage:") ||
                message.toLowerCase().contains("help")
            )) {
                assertTrue(true, "Main method failed with expected user error: " + message);
            } else {
                fail("Main method failed with unexpected error: " + e.getClass().getSimpleName() + " - " + message);
            }
        } finally {
            System.setOut(originalOut);
        }
    }

    @Test
    public void classInstantiationSmokeTest() {
        try {
            Class<?> mainClass = Class.forName("{qualified}");
            assertNotNull(mainClass, "Main class should be loadable");

            java.lang.reflect.Method mainMethod = mainClass.getMethod("main", String[].class);
            assertNotNull(mainMethod, "Main method should exist");
            assertTrue(java.lang.reflect.Modifier.isStatic(mainMethod.getModifiers()),
                      "Main method should be static");
            assertTrue(java.lang.reflect.Modifier.isPublic(mainMethod.getModifiers()),
                      "Main method should be public");
        } catch (Exception e) {
            fail("Class loading smoke test failed: " + e.getMessage());
        }
    }
}
"#;

const LIBRARY_TEMPLATE: &str = r#"package generated;

import org.junit.jupiter.api.Test;
import static org.junit.jupiter.api.Assertions.*;

public class GeneratedLibrarySmokeTest {

    @Test
    public void basicCompilationSmokeTest() {
        assertTrue(true, "Library compilation smoke test passed");
    }

    @Test
    public void javaVersionSmokeTest() {
        String javaVersion = System.getProperty("java.version");
        assertNotNull(javaVersion, "Java version should be available");
        assertTrue(javaVersion.length() > 0, "Java version should not be empty");
    }
{class_tests}}
"#;

const LIBRARY_CLASS_TEST: &str = r#"
    @Test
    public void {lower}InstantiationSmokeTest() {
        try {
            Class<?> testClass = Class.forName("{qualified}");
            assertNotNull(testClass, "{name} should be loadable");
            java.lang.reflect.Constructor<?>[] constructors = testClass.getConstructors();
            assertNotNull(constructors, "{name} should expose constructor info");
        } catch (ClassNotFoundException e) {
            fail("{name} class not found: " + e.getMessage());
        } catch (Exception e) {
            assertTrue(true, "{name} reflection completed with: " + e.getClass().getSimpleName());
        }
    }
"#;
