//! Packages that never contain the user's own code

const LIBRARY_PACKAGES: &[&str] = &[
    // JDK and JVM languages
    "java",
    "javax",
    "jdk",
    "sun",
    "com.sun",
    "kotlin",
    "kotlinx",
    "scala",
    "groovy",
    "org.codehaus.groovy",
    // Minecraft servers and proxies
    "net.minecraft",
    "com.mojang",
    "org.bukkit",
    "org.spigotmc",
    "io.papermc",
    "com.destroystokyo.paper",
    "net.md_5.bungee",
    "com.velocitypowered",
    "net.minecraftforge",
    "net.fabricmc",
    "org.spongepowered",
    // Common libraries
    "co.aikar",
    "com.comphenix.protocol",
    "com.google",
    "io.netty",
    "net.kyori",
    "org.apache",
    "org.slf4j",
    "org.springframework",
    "org.yaml.snakeyaml",
];

/// Whether `package` belongs to the JDK, a server platform or a common library
pub fn is_library_package(package: &str) -> bool {
    LIBRARY_PACKAGES.iter().any(|library| {
        package
            .strip_prefix(library)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
    })
}
