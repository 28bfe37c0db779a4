//! Built-in recipes.
use super::{Action, InstallRecipe, Plan, VersionSource};
use crate::adapters::{RepositorySpec, RpmRepo};
use crate::resources::package::PackageManagerKind::{Apt, Brew, Manual, Pacman, YumDnf};

const MICROSOFT_KEY: &str = "https://packages.microsoft.com/keys/microsoft.asc";
const TERRAFORM_FEED: &str = "https://api.releases.hashicorp.com/v1/releases/terraform?limit=20";

/// Every recipe, sorted by name.
#[must_use]
pub fn all() -> Vec<InstallRecipe> {
    vec![
        aws_cli(),
        azure_cli(),
        docker(),
        gcloud(),
        gradle(),
        java(),
        maven(),
        rust(),
        terraform(),
    ]
}

/// Look up a recipe by tool name.
#[must_use]
pub fn find(name: &str) -> Option<InstallRecipe> {
    all().into_iter().find(|r| r.name == name)
}

/// Names of every recipe.
#[must_use]
pub fn names() -> Vec<&'static str> {
    all().iter().map(|r| r.name).collect()
}

fn aws_cli() -> InstallRecipe {
    InstallRecipe::new("aws-cli", "AWS command line interface v2")
        .probe("aws")
        .verify("aws --version")
        .on(Pacman, Plan::new(vec![Action::packages(&["aws-cli-v2"])]))
        .on(Brew, Plan::new(vec![Action::packages(&["awscli"])]))
        .manual(Plan::new(vec![
            Action::download_extract(
                "https://awscli.amazonaws.com/awscli-exe-linux-{uname_arch}.zip",
                "{opt}/aws-cli-v2",
                true,
            ),
            Action::symlink("{opt}/aws-cli-v2/dist/aws", "{bin}/aws"),
        ]))
        .requires(Apt, &["ca-certificates"])
        .requires(YumDnf, &["ca-certificates"])
}

fn azure_cli() -> InstallRecipe {
    let repo = RepositorySpec {
        name: "azure-cli".to_string(),
        key_url: Some(MICROSOFT_KEY.to_string()),
        apt: Some(
            "deb [arch={arch} signed-by={keyring}] https://packages.microsoft.com/repos/azure-cli/ {codename} main"
                .to_string(),
        ),
        rpm: Some(RpmRepo::BaseUrl {
            baseurl: "https://packages.microsoft.com/yumrepos/azure-cli".to_string(),
            gpgkey: MICROSOFT_KEY.to_string(),
        }),
        brew_tap: None,
    };
    let packaged = Plan::new(vec![
        Action::AddRepository(repo),
        Action::packages(&["azure-cli"]),
    ]);
    InstallRecipe::new("azure-cli", "Microsoft Azure command line interface")
        .probe("az")
        .verify("az --version")
        .refresh_is_fatal()
        .requires(Apt, &["ca-certificates", "apt-transport-https"])
        .on(Apt, packaged.clone())
        .on(YumDnf, packaged)
        .on(Pacman, Plan::new(vec![Action::packages(&["azure-cli"])]))
        .on(Brew, Plan::new(vec![Action::packages(&["azure-cli"])]))
}

fn docker() -> InstallRecipe {
    let repo = RepositorySpec {
        name: "docker".to_string(),
        key_url: Some("https://download.docker.com/linux/{id}/gpg".to_string()),
        apt: Some(
            "deb [arch={arch} signed-by={keyring}] https://download.docker.com/linux/{id} {codename} stable"
                .to_string(),
        ),
        rpm: Some(RpmRepo::RepoFile {
            url: "https://download.docker.com/linux/{id}/docker-ce.repo".to_string(),
        }),
        brew_tap: None,
    };
    let packaged = Plan::new(vec![
        Action::AddRepository(repo),
        Action::packages(&["docker-ce", "docker-ce-cli", "containerd.io"]),
    ]);
    InstallRecipe::new("docker", "Docker engine and CLI")
        .probe("docker")
        .verify("docker --version")
        .refresh_is_fatal()
        .requires(Apt, &["ca-certificates"])
        .on(Apt, packaged.clone())
        .on(YumDnf, packaged)
        .on(Pacman, Plan::new(vec![Action::packages(&["docker"])]))
        .on(Brew, Plan::new(vec![Action::packages(&["cask:docker"])]))
}

fn gcloud() -> InstallRecipe {
    let repo = RepositorySpec {
        name: "google-cloud-sdk".to_string(),
        key_url: Some("https://packages.cloud.google.com/apt/doc/apt-key.gpg".to_string()),
        apt: Some("deb [signed-by={keyring}] https://packages.cloud.google.com/apt cloud-sdk main".to_string()),
        rpm: Some(RpmRepo::BaseUrl {
            baseurl: "https://packages.cloud.google.com/yum/repos/cloud-sdk-el9-{uname_arch}"
                .to_string(),
            gpgkey: "https://packages.cloud.google.com/yum/doc/rpm-package-key.gpg".to_string(),
        }),
        brew_tap: None,
    };
    let packaged = Plan::new(vec![
        Action::AddRepository(repo),
        Action::packages(&["google-cloud-cli"]),
    ]);
    InstallRecipe::new("gcloud", "Google Cloud CLI")
        .probe("gcloud")
        .verify("gcloud --version")
        .refresh_is_fatal()
        .requires(Apt, &["ca-certificates"])
        .requires(Pacman, &["python"])
        .on(Apt, packaged.clone())
        .on(YumDnf, packaged)
        .on(Brew, Plan::new(vec![Action::packages(&["cask:google-cloud-sdk"])]))
        .manual(Plan::new(vec![
            Action::download_extract(
                "https://dl.google.com/dl/cloudsdk/channels/rapid/downloads/google-cloud-cli-{os}-{uname_arch}.tar.gz",
                "{opt}/google-cloud-sdk",
                true,
            ),
            Action::symlink("{opt}/google-cloud-sdk/bin/gcloud", "{bin}/gcloud"),
        ]))
}

/// Versioned archive under `{opt}` with a stable `{opt}/<tool>` link.
fn jvm_archive(tool: &str, url: &str) -> Vec<Action> {
    let versioned = format!("{{opt}}/{tool}-{{version}}");
    vec![
        Action::download_extract(url, &versioned, true),
        Action::symlink(&versioned, &format!("{{opt}}/{tool}")),
    ]
}

fn gradle() -> InstallRecipe {
    let mut manual = Plan::new(jvm_archive(
        "gradle",
        "https://services.gradle.org/distributions/gradle-{version}-bin.zip",
    ))
    .export("GRADLE_HOME", "{opt}/gradle")
    .export("PATH", "${GRADLE_HOME}/bin:${PATH}");
    manual
        .actions
        .push(Action::symlink("{opt}/gradle/bin/gradle", "{bin}/gradle"));
    InstallRecipe::new("gradle", "Gradle build tool")
        .version(VersionSource::Fixed("8.5"))
        .probe("gradle")
        .verify("gradle --version")
        .requires(Apt, &["default-jre-headless"])
        .requires(YumDnf, &["java-17-openjdk-headless"])
        .requires(Pacman, &["jre17-openjdk-headless"])
        .requires(Manual, &["java"])
        .on(Brew, Plan::new(vec![Action::packages(&["gradle"])]))
        .manual(manual)
}

fn java() -> InstallRecipe {
    InstallRecipe::new("java", "OpenJDK 17 development kit")
        .probe("javac")
        .verify("java -version")
        .on(
            Apt,
            Plan::new(vec![Action::packages(&["openjdk-17-jdk"])])
                .export("JAVA_HOME", "/usr/lib/jvm/java-17-openjdk-{arch}"),
        )
        .on(
            YumDnf,
            Plan::new(vec![Action::packages(&["java-17-openjdk-devel"])])
                .export("JAVA_HOME", "/usr/lib/jvm/java-17-openjdk"),
        )
        .on(
            Pacman,
            Plan::new(vec![Action::packages(&["jdk17-openjdk"])])
                .export("JAVA_HOME", "/usr/lib/jvm/java-17-openjdk"),
        )
        .on(Brew, Plan::new(vec![Action::packages(&["openjdk@17"])]))
}

fn maven() -> InstallRecipe {
    let mut manual = Plan::new(jvm_archive(
        "maven",
        "https://archive.apache.org/dist/maven/maven-3/{version}/binaries/apache-maven-{version}-bin.tar.gz",
    ))
    .export("M2_HOME", "{opt}/maven")
    .export("MAVEN_HOME", "{opt}/maven")
    .export("PATH", "${M2_HOME}/bin:${PATH}");
    manual
        .actions
        .push(Action::symlink("{opt}/maven/bin/mvn", "{bin}/mvn"));
    InstallRecipe::new("maven", "Apache Maven")
        .version(VersionSource::Fixed("3.9.6"))
        .probe("mvn")
        .verify("mvn -version")
        .requires(Apt, &["default-jre-headless"])
        .requires(YumDnf, &["java-17-openjdk-headless"])
        .requires(Pacman, &["jre17-openjdk-headless"])
        .requires(Manual, &["java"])
        .on(Brew, Plan::new(vec![Action::packages(&["maven"])]))
        .manual(manual)
}

fn rust() -> InstallRecipe {
    InstallRecipe::new("rust", "Rust toolchain via rustup")
        .probe("cargo")
        .verify("cargo --version")
        .requires(Apt, &["curl", "build-essential"])
        .requires(YumDnf, &["curl", "gcc"])
        .requires(Pacman, &["curl", "base-devel"])
        .requires(Manual, &["cc"])
        .manual(
            Plan::new(vec![Action::download_run(
                "https://sh.rustup.rs",
                &["-y", "--no-modify-path"],
            )])
            .export("PATH", "$HOME/.cargo/bin:${PATH}"),
        )
}

fn terraform() -> InstallRecipe {
    let apt_repo = RepositorySpec {
        name: "hashicorp".to_string(),
        key_url: Some("https://apt.releases.hashicorp.com/gpg".to_string()),
        apt: Some(
            "deb [arch={arch} signed-by={keyring}] https://apt.releases.hashicorp.com {codename} main"
                .to_string(),
        ),
        ..RepositorySpec::default()
    };
    let tap = RepositorySpec {
        name: "hashicorp".to_string(),
        brew_tap: Some("hashicorp/tap".to_string()),
        ..RepositorySpec::default()
    };
    InstallRecipe::new("terraform", "HashiCorp Terraform")
        .version(VersionSource::Latest {
            feed_url: TERRAFORM_FEED,
        })
        .probe("terraform")
        .verify("terraform version")
        .refresh_is_fatal()
        .requires(Apt, &["ca-certificates"])
        .on(
            Apt,
            Plan::new(vec![
                Action::AddRepository(apt_repo),
                Action::packages(&["terraform"]),
            ]),
        )
        .on(Pacman, Plan::new(vec![Action::packages(&["terraform"])]))
        .on(
            Brew,
            Plan::new(vec![
                Action::AddRepository(tap),
                Action::packages(&["hashicorp/tap/terraform"]),
            ]),
        )
        .manual(Plan::new(vec![
            Action::download_extract(
                "https://releases.hashicorp.com/terraform/{version}/terraform_{version}_{os}_{arch}.zip",
                "{opt}/terraform-{version}",
                false,
            ),
            Action::symlink("{opt}/terraform-{version}/terraform", "{bin}/terraform"),
        ]))
}
